//! Tank Battle：转向、前后移动与自动追击的敌方坦克。

use serde::{Deserialize, Serialize};

use super::duel::Side;
use super::error::GameError;
use super::geometry::{Arena, Vec2};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TankConfig {
    pub arena: Arena,
    pub player_speed: f64,
    pub enemy_speed: f64,
    pub rotation_speed: f64,
    pub max_health: i32,
    pub tank_radius: f64,
    pub muzzle_offset: f64,
    pub bullet_speed: f64,
    pub bullet_damage: i32,
    pub enemy_fire_interval_secs: f64,
    pub enemy_engage_distance: f64,
}

impl TankConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        self.arena.validate(self.tank_radius)?;
        let finite = [
            self.player_speed,
            self.enemy_speed,
            self.rotation_speed,
            self.muzzle_offset,
            self.bullet_speed,
            self.enemy_engage_distance,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(GameError::InvalidConfig {
                reason: "tank speeds and distances must be finite".to_string(),
            });
        }
        if !self.enemy_fire_interval_secs.is_finite() || self.enemy_fire_interval_secs <= 0.0 {
            return Err(GameError::InvalidConfig {
                reason: "enemy_fire_interval_secs must be positive".to_string(),
            });
        }
        if self.max_health <= 0 {
            return Err(GameError::InvalidConfig {
                reason: "max_health must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            player_speed: 3.0,
            enemy_speed: 2.0,
            rotation_speed: 3.0,
            max_health: 100,
            tank_radius: 20.0,
            muzzle_offset: 35.0,
            bullet_speed: 7.0,
            bullet_damage: 10,
            enemy_fire_interval_secs: 2.0,
            enemy_engage_distance: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tank {
    pub pos: Vec2,
    /// 角度制，0 朝右，逆时针增加。
    pub angle: f64,
    pub speed: f64,
    pub rotation_speed: f64,
    pub health: i32,
    pub radius: f64,
}

impl Tank {
    /// 只有新位置严格在场内才移动。
    pub fn drive(&mut self, forward: bool, arena: &Arena) {
        let distance = if forward { self.speed } else { -self.speed };
        let next = self.pos + Vec2::from_heading(self.angle) * distance;
        if arena.contains_strict(next) {
            self.pos = next;
        }
    }

    /// `positive` 为 true 时角度增加。
    pub fn rotate(&mut self, positive: bool) {
        let delta = if positive {
            self.rotation_speed
        } else {
            -self.rotation_speed
        };
        self.angle = (self.angle + delta).rem_euclid(360.0);
    }

    pub fn muzzle(&self, offset: f64) -> Vec2 {
        self.pos + Vec2::from_heading(self.angle) * offset
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shell {
    pub pos: Vec2,
    pub angle: f64,
    pub owner: Side,
}

/// 按键状态：方向键按住期间为 true，`fire` 仅在空格按下的那一帧为 true。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TankInput {
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub forward: bool,
    pub backward: bool,
    pub fire: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TankEvent {
    ShellFired { owner: Side },
    TankHit { target: Side, health: i32 },
    BattleOver { winner: Side },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankState {
    #[serde(default)]
    pub config: TankConfig,
    pub player: Tank,
    pub enemy: Tank,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shells: Vec<Shell>,
    #[serde(default)]
    pub enemy_fire_timer: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
}

/// 把角度差折算到 (-180, 180]。
pub fn signed_angle_diff(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

impl TankState {
    pub fn new(config: TankConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::fresh(config))
    }

    fn fresh(config: TankConfig) -> Self {
        let tank = |x: f64, speed: f64| Tank {
            pos: Vec2::new(x, config.arena.height / 2.0),
            angle: 0.0,
            speed,
            rotation_speed: config.rotation_speed,
            health: config.max_health,
            radius: config.tank_radius,
        };
        Self {
            player: tank(100.0, config.player_speed),
            enemy: tank(config.arena.width - 100.0, config.enemy_speed),
            config,
            shells: Vec::new(),
            enemy_fire_timer: 0.0,
            winner: None,
        }
    }

    pub fn restart(&mut self) {
        *self = TankState::fresh(self.config.clone());
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    fn shoot(&mut self, owner: Side) -> TankEvent {
        let tank = match owner {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        };
        let shell = Shell {
            pos: tank.muzzle(self.config.muzzle_offset),
            angle: tank.angle,
            owner,
        };
        self.shells.push(shell);
        TankEvent::ShellFired { owner }
    }

    /// 敌方转向玩家，距离大于交战距离时前进。
    fn steer_enemy(&mut self) {
        let to_player = self.player.pos - self.enemy.pos;
        let bearing = (-to_player.y).atan2(to_player.x).to_degrees();
        let diff = signed_angle_diff(self.enemy.angle, bearing);
        if diff > 0.0 {
            self.enemy.rotate(true);
        } else if diff < 0.0 {
            self.enemy.rotate(false);
        }
        if to_player.length() > self.config.enemy_engage_distance {
            let arena = self.config.arena;
            self.enemy.drive(true, &arena);
        }
    }

    pub fn step(&mut self, input: &TankInput, dt_secs: f64) -> Vec<TankEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        if input.fire {
            events.push(self.shoot(Side::Player));
        }
        let arena = self.config.arena;
        if input.rotate_left {
            self.player.rotate(false);
        }
        if input.rotate_right {
            self.player.rotate(true);
        }
        if input.forward {
            self.player.drive(true, &arena);
        }
        if input.backward {
            self.player.drive(false, &arena);
        }

        self.enemy_fire_timer += dt_secs;
        if self.enemy_fire_timer >= self.config.enemy_fire_interval_secs {
            events.push(self.shoot(Side::Enemy));
            self.enemy_fire_timer = 0.0;
        }
        self.steer_enemy();

        let speed = self.config.bullet_speed;
        let damage = self.config.bullet_damage;
        let shells = std::mem::take(&mut self.shells);
        for mut shell in shells {
            shell.pos += Vec2::from_heading(shell.angle) * speed;
            if !arena.contains(shell.pos) {
                continue;
            }
            let target_side = shell.owner.opponent();
            let target = match target_side {
                Side::Player => &mut self.player,
                Side::Enemy => &mut self.enemy,
            };
            if shell.pos.distance(target.pos) < target.radius {
                target.health -= damage;
                events.push(TankEvent::TankHit {
                    target: target_side,
                    health: target.health,
                });
                if target.health <= 0 && self.winner.is_none() {
                    let winner = shell.owner;
                    self.winner = Some(winner);
                    events.push(TankEvent::BattleOver { winner });
                }
                continue;
            }
            self.shells.push(shell);
        }

        events
    }

    pub fn status_text(&self) -> Option<String> {
        self.winner.map(|winner| match winner {
            Side::Player => "Game Over! Player wins!".to_string(),
            Side::Enemy => "Game Over! Enemy wins!".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn angle_difference_takes_short_way_round() {
        assert_eq!(signed_angle_diff(350.0, 10.0), 20.0);
        assert_eq!(signed_angle_diff(10.0, 350.0), -20.0);
        assert_eq!(signed_angle_diff(0.0, 180.0), 180.0);
    }

    #[test]
    fn rotation_wraps_around() {
        let mut state = TankState::new(TankConfig::default()).expect("default config");
        state.player.rotate(false);
        assert_eq!(state.player.angle, 357.0);
        state.player.rotate(true);
        assert_eq!(state.player.angle, 0.0);
    }

    #[test]
    fn driving_stops_at_the_edge() {
        let mut state = TankState::new(TankConfig::default()).expect("default config");
        state.player.angle = 180.0;
        let arena = state.config.arena;
        for _ in 0..100 {
            state.player.drive(true, &arena);
        }
        assert!(state.player.pos.x > 0.0 && state.player.pos.x <= 3.0);
    }

    #[test]
    fn enemy_turns_toward_player_and_closes_in() {
        let mut state = TankState::new(TankConfig::default()).expect("default config");
        let start_x = state.enemy.pos.x;
        state.step(&TankInput::default(), DT);
        // 玩家在正左方（180 度），敌方从 0 度开始转
        assert_eq!(state.enemy.angle, 3.0);
        for _ in 0..120 {
            state.step(&TankInput::default(), DT);
        }
        assert!(state.enemy.pos.x < start_x);
    }

    #[test]
    fn enemy_fires_on_interval() {
        let mut state = TankState::new(TankConfig::default()).expect("default config");
        let mut fired = 0;
        for _ in 0..121 {
            fired += state
                .step(&TankInput::default(), DT)
                .iter()
                .filter(|event| matches!(event, TankEvent::ShellFired { owner: Side::Enemy }))
                .count();
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn player_shell_hits_enemy() {
        let mut state = TankState::new(TankConfig {
            enemy_fire_interval_secs: 1_000.0,
            enemy_speed: 0.0,
            rotation_speed: 0.0,
            ..TankConfig::default()
        })
        .expect("valid config");
        let fire = TankInput {
            fire: true,
            ..TankInput::default()
        };
        state.step(&fire, DT);
        let mut hit = false;
        for _ in 0..120 {
            let events = state.step(&TankInput::default(), DT);
            if events.contains(&TankEvent::TankHit {
                target: Side::Enemy,
                health: 90,
            }) {
                hit = true;
                break;
            }
        }
        assert!(hit);
    }

    #[test]
    fn battle_ends_when_health_runs_out() {
        let mut state = TankState::new(TankConfig {
            enemy_fire_interval_secs: 1_000.0,
            enemy_speed: 0.0,
            rotation_speed: 0.0,
            ..TankConfig::default()
        })
        .expect("valid config");
        state.enemy.health = 10;
        let fire = TankInput {
            fire: true,
            ..TankInput::default()
        };
        state.step(&fire, DT);
        for _ in 0..120 {
            state.step(&TankInput::default(), DT);
        }
        assert_eq!(state.winner, Some(Side::Player));
        assert_eq!(state.status_text().as_deref(), Some("Game Over! Player wins!"));
        assert!(state.step(&fire, DT).is_empty());
    }

    #[test]
    fn rejects_unplayable_tank_configs() {
        let bad = [
            TankConfig {
                arena: Arena::new(0.0, 0.0),
                ..TankConfig::default()
            },
            TankConfig {
                enemy_fire_interval_secs: 0.0,
                ..TankConfig::default()
            },
            TankConfig {
                rotation_speed: f64::NAN,
                ..TankConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                TankState::new(config),
                Err(GameError::InvalidConfig { .. })
            ));
        }
    }
}
