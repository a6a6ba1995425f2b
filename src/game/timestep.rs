use serde::{Deserialize, Serialize};

pub const FRAMES_PER_SECOND: u32 = 60;
const DEFAULT_MAX_STEPS_PER_FRAME: u32 = 5;

/// 把宿主每帧的耗时折算成若干个固定步长（1/60 秒）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedTimestep {
    pub step_ms: f64,
    pub accumulator_ms: f64,
    pub max_steps_per_frame: u32,
}

impl FixedTimestep {
    pub fn new(step_ms: f64, max_steps_per_frame: u32) -> Self {
        Self {
            step_ms,
            accumulator_ms: 0.0,
            max_steps_per_frame: max_steps_per_frame.max(1),
        }
    }

    pub fn step_secs(&self) -> f64 {
        self.step_ms / 1000.0
    }

    /// 返回本帧需要推进的步数。超过上限的积压直接丢弃，避免切回标签页时追帧。
    pub fn advance(&mut self, elapsed_ms: f64) -> u32 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }
        self.accumulator_ms += elapsed_ms;
        let mut steps = 0;
        while self.accumulator_ms >= self.step_ms {
            self.accumulator_ms -= self.step_ms;
            steps += 1;
            if steps == self.max_steps_per_frame {
                self.accumulator_ms = self.accumulator_ms.min(self.step_ms);
                break;
            }
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator_ms = 0.0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        FixedTimestep::new(1000.0 / FRAMES_PER_SECOND as f64, DEFAULT_MAX_STEPS_PER_FRAME)
    }
}
