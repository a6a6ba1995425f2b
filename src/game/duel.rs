//! CS Battle：鼠标瞄准的俯视角对射。

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;
use super::geometry::{Arena, Vec2};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuelConfig {
    pub arena: Arena,
    pub fighter_radius: f64,
    pub fighter_speed: f64,
    pub max_health: i32,
    pub starting_ammo: u32,
    pub bullet_speed: f64,
    pub bullet_radius: f64,
    pub bullet_damage: i32,
    pub enemy_fire_chance: f64,
}

impl DuelConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        self.arena.validate(self.fighter_radius)?;
        let invalid = |reason: &str| {
            Err(GameError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if !(0.0..=1.0).contains(&self.enemy_fire_chance) {
            return invalid("enemy_fire_chance must lie in [0, 1]");
        }
        let speeds = [self.fighter_speed, self.bullet_speed, self.bullet_radius];
        if speeds.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return invalid("speeds and bullet_radius must be non-negative numbers");
        }
        if self.max_health <= 0 {
            return invalid("max_health must be positive");
        }
        Ok(())
    }
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            fighter_radius: 20.0,
            fighter_speed: 5.0,
            max_health: 100,
            starting_ammo: 30,
            bullet_speed: 10.0,
            bullet_radius: 8.0,
            bullet_damage: 10,
            enemy_fire_chance: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fighter {
    pub pos: Vec2,
    pub radius: f64,
    pub health: i32,
    pub ammo: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuelBullet {
    pub pos: Vec2,
    pub dir: Vec2,
    pub owner: Side,
}

/// 一帧的输入：方向键取值 -1..=1，`fire_at` 为本帧的鼠标点击位置。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuelInput {
    pub dx: i8,
    pub dy: i8,
    pub fire_at: Option<Vec2>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DuelEvent {
    ShotFired { owner: Side },
    FighterHit { target: Side, health: i32 },
    DuelOver { winner: Side },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuelState {
    #[serde(default)]
    pub config: DuelConfig,
    pub player: Fighter,
    pub enemy: Fighter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<DuelBullet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    #[serde(default)]
    pub frame: u64,
}

impl DuelState {
    pub fn new(config: DuelConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::fresh(config))
    }

    fn fresh(config: DuelConfig) -> Self {
        let arena = config.arena;
        let fighter = |x: f64, ammo: u32| Fighter {
            pos: Vec2::new(x, arena.height / 2.0),
            radius: config.fighter_radius,
            health: config.max_health,
            ammo,
        };
        Self {
            player: fighter(100.0, config.starting_ammo),
            enemy: fighter(arena.width - 100.0, 0),
            config,
            bullets: Vec::new(),
            winner: None,
            frame: 0,
        }
    }

    pub fn restart(&mut self) {
        *self = DuelState::fresh(self.config.clone());
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn fighter(&self, side: Side) -> &Fighter {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn fighter_mut(&mut self, side: Side) -> &mut Fighter {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// 朝目标点发射；目标与自身重合时无法确定方向，忽略。
    fn fire(&mut self, owner: Side, target: Vec2) -> Option<DuelEvent> {
        let origin = self.fighter(owner).pos;
        let dir = (target - origin).normalized()?;
        self.bullets.push(DuelBullet {
            pos: origin,
            dir,
            owner,
        });
        Some(DuelEvent::ShotFired { owner })
    }

    pub fn step<R: Rng + ?Sized>(&mut self, input: &DuelInput, rng: &mut R) -> Vec<DuelEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }
        self.frame += 1;

        let delta = Vec2::new(
            input.dx.clamp(-1, 1) as f64,
            input.dy.clamp(-1, 1) as f64,
        ) * self.config.fighter_speed;
        self.player.pos = self
            .config
            .arena
            .clamp_circle(self.player.pos + delta, self.player.radius);

        if let Some(target) = input.fire_at {
            if self.player.ammo > 0 {
                if let Some(event) = self.fire(Side::Player, target) {
                    self.player.ammo -= 1;
                    events.push(event);
                }
            }
        }

        if rng.gen::<f64>() < self.config.enemy_fire_chance {
            let target = self.player.pos;
            if let Some(event) = self.fire(Side::Enemy, target) {
                events.push(event);
            }
        }

        let speed = self.config.bullet_speed;
        let damage = self.config.bullet_damage;
        let arena = self.config.arena;
        let bullets = std::mem::take(&mut self.bullets);
        for mut bullet in bullets {
            bullet.pos += bullet.dir * speed;
            if !arena.contains(bullet.pos) {
                continue;
            }
            let target_side = bullet.owner.opponent();
            let target = self.fighter_mut(target_side);
            if bullet.pos.distance(target.pos) < target.radius {
                target.health -= damage;
                events.push(DuelEvent::FighterHit {
                    target: target_side,
                    health: target.health,
                });
                continue;
            }
            self.bullets.push(bullet);
        }

        if self.player.health <= 0 || self.enemy.health <= 0 {
            let winner = if self.player.health <= 0 {
                Side::Enemy
            } else {
                Side::Player
            };
            self.winner = Some(winner);
            events.push(DuelEvent::DuelOver { winner });
        }

        events
    }

    pub fn status_text(&self) -> Option<String> {
        self.winner.map(|winner| {
            let name = match winner {
                Side::Player => "Player",
                Side::Enemy => "Enemy",
            };
            format!("Game Over! {name} wins!")
        })
    }
}
