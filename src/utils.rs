//! 宿主环境相关的工具：控制台日志、panic hook 与单调时钟。

use std::time::Duration;

pub fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&message.into());
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

pub fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&message.into());
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

pub fn error(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&message.into());
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

/// 格式化后写入浏览器控制台。
#[macro_export]
macro_rules! console_log {
    ($($arg:tt)*) => {
        $crate::utils::log(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! console_warn {
    ($($arg:tt)*) => {
        $crate::utils::warn(&format!($($arg)*))
    };
}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> f64 {
    web_sys::js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> f64 {
    use once_cell::sync::Lazy;

    static ORIGIN: Lazy<std::time::Instant> = Lazy::new(std::time::Instant::now);
    ORIGIN.elapsed().as_secs_f64() * 1000.0
}

/// 单调时钟。wasm 中 `std::time::Instant` 不可用，因此浏览器里使用 `Date.now()`。
#[derive(Debug, Clone, Copy)]
pub struct Instant {
    timestamp: f64,
}

impl Instant {
    pub fn now() -> Self {
        Self {
            timestamp: now_millis(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        let elapsed_ms = (now_millis() - self.timestamp).max(0.0);
        Duration::from_millis(elapsed_ms as u64)
    }
}

impl std::ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, duration: Duration) -> Self::Output {
        Self {
            timestamp: self.timestamp + duration.as_millis() as f64,
        }
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.timestamp.partial_cmp(&other.timestamp)
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_lies_after_start() {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(50);
        assert!(deadline > start);
        assert!(Instant::now() < deadline + Duration::from_secs(60));
    }

    #[test]
    fn logging_is_silent_off_wasm() {
        console_log!("score {}", 42);
        console_warn!("rejected {}", "move");
        error("boom");
    }
}
