use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::error::GameError;

/// 屏幕坐标系下的二维向量，y 轴向下。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 角度制朝向，逆时针为正；由于 y 轴向下，sin 分量取负。
    pub fn from_heading(degrees: f64) -> Self {
        let radians = degrees.to_radians();
        Self::new(radians.cos(), -radians.sin())
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len <= f64::EPSILON || !len.is_finite() {
            return None;
        }
        Some(Vec2::new(self.x / len, self.y / len))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Arena {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 场地必须能放下一个半径为 `radius` 的圆。
    pub fn validate(&self, radius: f64) -> Result<(), GameError> {
        let fits = radius.is_finite()
            && radius >= 0.0
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 2.0 * radius
            && self.height > 2.0 * radius;
        if fits {
            Ok(())
        } else {
            Err(GameError::InvalidConfig {
                reason: format!(
                    "arena {}x{} cannot hold radius {}",
                    self.width, self.height, radius
                ),
            })
        }
    }

    /// 边界上的点仍算在场内。
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    pub fn contains_strict(&self, point: Vec2) -> bool {
        point.x > 0.0 && point.x < self.width && point.y > 0.0 && point.y < self.height
    }

    /// 让半径为 `radius` 的圆完整留在场内。
    pub fn clamp_circle(&self, point: Vec2, radius: f64) -> Vec2 {
        Vec2::new(
            point.x.max(radius).min(self.width - radius),
            point.y.max(radius).min(self.height - radius),
        )
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new(800.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_zero_points_right_and_ninety_points_up() {
        let right = Vec2::from_heading(0.0);
        assert!((right.x - 1.0).abs() < 1e-9 && right.y.abs() < 1e-9);
        let up = Vec2::from_heading(90.0);
        assert!(up.x.abs() < 1e-9 && (up.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_keeps_circle_inside() {
        let arena = Arena::default();
        let clamped = arena.clamp_circle(Vec2::new(-50.0, 900.0), 20.0);
        assert_eq!(clamped, Vec2::new(20.0, 580.0));
    }

    #[test]
    fn zero_vector_has_no_direction() {
        assert!(Vec2::ZERO.normalized().is_none());
        let unit = Vec2::new(3.0, 4.0).normalized().expect("non-zero vector");
        assert!((unit.length() - 1.0).abs() < 1e-12);
    }
}
