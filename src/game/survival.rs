//! Grid Survival：在网格上收集补给、躲避追踪者与落下的树枝。

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurvivalConfig {
    pub width: i32,
    pub height: i32,
    pub max_stat: i32,
    pub resource_spawn_frames: i32,
    pub max_resources: usize,
    pub food_weight: f64,
    pub water_weight: f64,
    pub health_weight: f64,
    pub food_gain: i32,
    pub water_gain: i32,
    pub health_gain: i32,
    pub hazard_spawn_chance: f64,
    pub max_hazards: usize,
    pub hazard_damage: i32,
    pub hazard_move_secs: f64,
    pub branch_spawn_secs: f64,
    pub max_branches: usize,
    pub branch_min_delay_secs: u32,
    pub branch_max_delay_secs: u32,
    pub branch_damage: i32,
    pub gun_spawn_frames: i32,
    pub max_guns: usize,
    pub gun_ammo: u32,
    pub max_ammo: u32,
    pub shoot_cooldown_frames: u32,
    pub bullet_cells_per_tick: i32,
    pub bullet_hit_chance: f64,
    pub stat_decay_secs: f64,
}

fn invalid(reason: impl Into<String>) -> GameError {
    GameError::InvalidConfig {
        reason: reason.into(),
    }
}

impl SurvivalConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        // 玩家出生在倒数第二行
        if self.width < 1 || self.height < 2 {
            return Err(invalid(format!(
                "grid {}x{} is too small",
                self.width, self.height
            )));
        }
        if self.max_stat <= 0 {
            return Err(invalid("max_stat must be positive"));
        }
        for (name, chance) in [
            ("hazard_spawn_chance", self.hazard_spawn_chance),
            ("bullet_hit_chance", self.bullet_hit_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(invalid(format!("{name} must lie in [0, 1]")));
            }
        }
        for (name, weight) in [
            ("food_weight", self.food_weight),
            ("water_weight", self.water_weight),
            ("health_weight", self.health_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number")));
            }
        }
        for (name, secs) in [
            ("hazard_move_secs", self.hazard_move_secs),
            ("branch_spawn_secs", self.branch_spawn_secs),
            ("stat_decay_secs", self.stat_decay_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(invalid(format!("{name} must be a positive number")));
            }
        }
        if self.branch_min_delay_secs > self.branch_max_delay_secs {
            return Err(invalid("branch_min_delay_secs exceeds branch_max_delay_secs"));
        }
        Ok(())
    }
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 15,
            max_stat: 100,
            resource_spawn_frames: 60,
            max_resources: 5,
            food_weight: 0.4,
            water_weight: 0.4,
            health_weight: 0.2,
            food_gain: 20,
            water_gain: 20,
            health_gain: 30,
            hazard_spawn_chance: 0.01,
            max_hazards: 5,
            hazard_damage: 10,
            hazard_move_secs: 1.0,
            branch_spawn_secs: 2.0,
            max_branches: 3,
            branch_min_delay_secs: 3,
            branch_max_delay_secs: 8,
            branch_damage: 20,
            gun_spawn_frames: 300,
            max_guns: 1,
            gun_ammo: 10,
            max_ammo: 10,
            shoot_cooldown_frames: 30,
            bullet_cells_per_tick: 2,
            bullet_hit_chance: 0.8,
            stat_decay_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Food,
    Water,
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub pos: Pos,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub pos: Pos,
    pub fall_timer: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridBullet {
    pub pos: Pos,
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Survivor {
    pub pos: Pos,
    pub health: i32,
    pub food: i32,
    pub water: i32,
    pub ammo: u32,
    /// 最近一次移动方向，射击沿此方向。
    pub facing: (i32, i32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SurvivalCommand {
    Move { dx: i32, dy: i32 },
    Shoot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DamageSource {
    Hazard,
    Branch,
    Starvation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SurvivalEvent {
    ResourceCollected { kind: ResourceKind },
    GunCollected { ammo: u32 },
    ShotFired,
    Damaged { source: DamageSource, health: i32 },
    HazardDestroyed { pos: Pos },
    GameOver { survived_secs: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurvivalState {
    #[serde(default)]
    pub config: SurvivalConfig,
    pub player: Survivor,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub hazards: Vec<Pos>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub guns: Vec<Pos>,
    #[serde(default)]
    pub bullets: Vec<GridBullet>,
    pub spawn_timer: i32,
    pub gun_spawn_timer: i32,
    pub shoot_timer: u32,
    pub stat_timer: f64,
    pub hazard_move_timer: f64,
    pub branch_spawn_timer: f64,
    pub survived_secs: f64,
    pub frame: u64,
    pub game_over: bool,
}

fn step_toward(from: i32, to: i32) -> i32 {
    (to - from).signum()
}

impl SurvivalState {
    pub fn new(config: SurvivalConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::fresh(config))
    }

    fn fresh(config: SurvivalConfig) -> Self {
        let player = Survivor {
            pos: Pos::new(config.width / 2, config.height - 2),
            health: config.max_stat,
            food: config.max_stat,
            water: config.max_stat,
            ammo: 0,
            facing: (0, 0),
        };
        Self {
            config,
            player,
            resources: Vec::new(),
            hazards: Vec::new(),
            branches: Vec::new(),
            guns: Vec::new(),
            bullets: Vec::new(),
            spawn_timer: 0,
            gun_spawn_timer: 0,
            shoot_timer: 0,
            stat_timer: 0.0,
            hazard_move_timer: 0.0,
            branch_spawn_timer: 0.0,
            survived_secs: 0.0,
            frame: 0,
            game_over: false,
        }
    }

    pub fn restart(&mut self) {
        *self = SurvivalState::fresh(self.config.clone());
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.x < self.config.width && pos.y >= 0 && pos.y < self.config.height
    }

    fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Pos {
        Pos::new(
            rng.gen_range(0..self.config.width),
            rng.gen_range(0..self.config.height),
        )
    }

    fn apply_command(&mut self, command: &SurvivalCommand, events: &mut Vec<SurvivalEvent>) {
        match *command {
            SurvivalCommand::Move { dx, dy } => {
                let (dx, dy) = (dx.clamp(-1, 1), dy.clamp(-1, 1));
                let next = Pos::new(self.player.pos.x + dx, self.player.pos.y + dy);
                if self.in_bounds(next) {
                    self.player.pos = next;
                    if dx != 0 || dy != 0 {
                        self.player.facing = (dx, dy);
                    }
                }
            }
            SurvivalCommand::Shoot => {
                let (dx, dy) = self.player.facing;
                if self.player.ammo > 0 && self.shoot_timer == 0 && (dx != 0 || dy != 0) {
                    self.bullets.push(GridBullet {
                        pos: self.player.pos,
                        dx,
                        dy,
                    });
                    self.player.ammo -= 1;
                    self.shoot_timer = self.config.shoot_cooldown_frames;
                    events.push(SurvivalEvent::ShotFired);
                }
            }
        }
    }

    fn roll_resource_kind<R: Rng + ?Sized>(&self, rng: &mut R) -> ResourceKind {
        let c = &self.config;
        let total = c.food_weight + c.water_weight + c.health_weight;
        if total <= 0.0 {
            return ResourceKind::Food;
        }
        let roll = rng.gen::<f64>() * total;
        if roll < c.food_weight {
            ResourceKind::Food
        } else if roll < c.food_weight + c.water_weight {
            ResourceKind::Water
        } else {
            ResourceKind::Health
        }
    }

    fn spawn_resource<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.resources.len() < self.config.max_resources && self.spawn_timer <= 0 {
            let kind = self.roll_resource_kind(rng);
            let pos = self.random_cell(rng);
            self.resources.push(Resource { pos, kind });
            self.spawn_timer = self.config.resource_spawn_frames;
        } else {
            self.spawn_timer -= 1;
        }
    }

    fn spawn_gun<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.guns.len() < self.config.max_guns && self.gun_spawn_timer <= 0 {
            let pos = self.random_cell(rng);
            self.guns.push(pos);
            self.gun_spawn_timer = self.config.gun_spawn_frames;
        } else {
            self.gun_spawn_timer -= 1;
        }
    }

    fn spawn_branch<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.branches.len() < self.config.max_branches {
            let min = self.config.branch_min_delay_secs;
            let max = self.config.branch_max_delay_secs.max(min);
            self.branches.push(Branch {
                pos: Pos::new(rng.gen_range(0..self.config.width), 0),
                fall_timer: rng.gen_range(min..=max) as f64,
            });
        }
    }

    fn damage(&mut self, source: DamageSource, amount: i32, events: &mut Vec<SurvivalEvent>) {
        self.player.health -= amount;
        events.push(SurvivalEvent::Damaged {
            source,
            health: self.player.health,
        });
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        commands: &[SurvivalCommand],
        dt_secs: f64,
        rng: &mut R,
    ) -> Vec<SurvivalEvent> {
        let mut events = Vec::new();
        if self.game_over {
            return events;
        }
        self.frame += 1;
        self.survived_secs += dt_secs;

        for command in commands {
            self.apply_command(command, &mut events);
        }

        self.spawn_resource(rng);
        self.spawn_gun(rng);
        if self.hazards.len() < self.config.max_hazards
            && rng.gen::<f64>() < self.config.hazard_spawn_chance
        {
            let pos = self.random_cell(rng);
            self.hazards.push(pos);
        }

        self.branch_spawn_timer += dt_secs;
        if self.branch_spawn_timer >= self.config.branch_spawn_secs {
            self.spawn_branch(rng);
            self.branch_spawn_timer = 0.0;
        }

        let here = self.player.pos;
        let max_stat = self.config.max_stat;
        let mut collected = Vec::new();
        self.resources.retain(|resource| {
            if resource.pos == here {
                collected.push(resource.kind);
                false
            } else {
                true
            }
        });
        for kind in collected {
            let player = &mut self.player;
            match kind {
                ResourceKind::Food => player.food = (player.food + self.config.food_gain).min(max_stat),
                ResourceKind::Water => {
                    player.water = (player.water + self.config.water_gain).min(max_stat)
                }
                ResourceKind::Health => {
                    player.health = (player.health + self.config.health_gain).min(max_stat)
                }
            }
            events.push(SurvivalEvent::ResourceCollected { kind });
        }

        let before = self.hazards.len();
        self.hazards.retain(|hazard| *hazard != here);
        for _ in self.hazards.len()..before {
            self.damage(DamageSource::Hazard, self.config.hazard_damage, &mut events);
        }

        // 计时结束后每帧下落一格
        let height = self.config.height;
        let mut branch_hits = 0;
        let branches = std::mem::take(&mut self.branches);
        for mut branch in branches {
            branch.fall_timer -= dt_secs;
            if branch.fall_timer <= 0.0 {
                branch.pos.y += 1;
            }
            if branch.pos.y >= height {
                continue;
            }
            if branch.pos == here {
                branch_hits += 1;
                continue;
            }
            self.branches.push(branch);
        }
        for _ in 0..branch_hits {
            self.damage(DamageSource::Branch, self.config.branch_damage, &mut events);
        }

        self.hazard_move_timer += dt_secs;
        if self.hazard_move_timer >= self.config.hazard_move_secs {
            let (width, height) = (self.config.width, self.config.height);
            for hazard in &mut self.hazards {
                hazard.x = (hazard.x + step_toward(hazard.x, here.x)).clamp(0, width - 1);
                hazard.y = (hazard.y + step_toward(hazard.y, here.y)).clamp(0, height - 1);
            }
            self.hazard_move_timer = 0.0;
        }

        self.stat_timer += dt_secs;
        if self.stat_timer >= self.config.stat_decay_secs {
            self.player.food = (self.player.food - 1).max(0);
            self.player.water = (self.player.water - 1).max(0);
            if self.player.food == 0 || self.player.water == 0 {
                self.player.health = (self.player.health - 1).max(0);
                events.push(SurvivalEvent::Damaged {
                    source: DamageSource::Starvation,
                    health: self.player.health,
                });
            }
            self.stat_timer = 0.0;
        }

        let guns_before = self.guns.len();
        self.guns.retain(|gun| *gun != here);
        for _ in self.guns.len()..guns_before {
            self.player.ammo = (self.player.ammo + self.config.gun_ammo).min(self.config.max_ammo);
            events.push(SurvivalEvent::GunCollected {
                ammo: self.player.ammo,
            });
        }

        self.update_bullets(rng, &mut events);

        self.shoot_timer = self.shoot_timer.saturating_sub(1);

        if self.player.health <= 0 {
            self.game_over = true;
            events.push(SurvivalEvent::GameOver {
                survived_secs: self.survived_secs,
            });
        }

        events
    }

    /// 子弹每帧跳两格，只检查落点，因此可能越过追踪者。
    fn update_bullets<R: Rng + ?Sized>(&mut self, rng: &mut R, events: &mut Vec<SurvivalEvent>) {
        let cells = self.config.bullet_cells_per_tick;
        let bullets = std::mem::take(&mut self.bullets);
        for mut bullet in bullets {
            bullet.pos.x += bullet.dx * cells;
            bullet.pos.y += bullet.dy * cells;
            if !self.in_bounds(bullet.pos) {
                continue;
            }
            if let Some(index) = self.hazards.iter().position(|hazard| *hazard == bullet.pos) {
                if rng.gen::<f64>() < self.config.bullet_hit_chance {
                    let pos = self.hazards.remove(index);
                    events.push(SurvivalEvent::HazardDestroyed { pos });
                }
                continue;
            }
            self.bullets.push(bullet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const DT: f64 = 1.0 / 60.0;

    fn calm() -> SurvivalState {
        SurvivalState::new(SurvivalConfig {
            max_resources: 0,
            max_guns: 0,
            hazard_spawn_chance: 0.0,
            max_branches: 0,
            ..SurvivalConfig::default()
        })
        .expect("valid config")
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(12)
    }

    #[test]
    fn starts_near_bottom_center() {
        let state = SurvivalState::new(SurvivalConfig::default()).expect("default config");
        assert_eq!(state.player.pos, Pos::new(10, 13));
        assert_eq!(state.player.health, 100);
        assert_eq!(state.player.ammo, 0);
    }

    #[test]
    fn movement_stays_on_grid_and_sets_facing() {
        let mut state = calm();
        let mut rng = rng();
        state.player.pos = Pos::new(0, 0);
        state.step(&[SurvivalCommand::Move { dx: -1, dy: 0 }], DT, &mut rng);
        assert_eq!(state.player.pos, Pos::new(0, 0));
        assert_eq!(state.player.facing, (0, 0));
        state.step(&[SurvivalCommand::Move { dx: 1, dy: 0 }], DT, &mut rng);
        assert_eq!(state.player.pos, Pos::new(1, 0));
        assert_eq!(state.player.facing, (1, 0));
    }

    #[test]
    fn spawners_fill_the_grid() {
        let mut state = SurvivalState::new(SurvivalConfig::default()).expect("default config");
        let mut rng = rng();
        state.step(&[], DT, &mut rng);
        assert_eq!(state.spawn_timer, 60);
        assert_eq!(state.gun_spawn_timer, 300);
        for _ in 0..600 {
            state.step(&[], DT, &mut rng);
        }
        assert!(state.resources.len() <= 5);
        assert!(state.hazards.len() <= 5);
        assert!(state.branches.len() <= 3);
        assert!(state.guns.len() <= 1);
    }

    #[test]
    fn supplies_are_capped() {
        let mut state = calm();
        let mut rng = rng();
        let here = state.player.pos;
        state.player.food = 90;
        state.player.health = 50;
        state.resources.push(Resource {
            pos: here,
            kind: ResourceKind::Food,
        });
        state.resources.push(Resource {
            pos: here,
            kind: ResourceKind::Health,
        });
        let events = state.step(&[], DT, &mut rng);
        assert_eq!(state.player.food, 100);
        assert_eq!(state.player.health, 80);
        assert!(state.resources.is_empty());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SurvivalEvent::ResourceCollected { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn hazard_contact_hurts_and_consumes_hazard() {
        let mut state = calm();
        let mut rng = rng();
        state.hazards.push(state.player.pos);
        state.step(&[], DT, &mut rng);
        assert_eq!(state.player.health, 90);
        assert!(state.hazards.is_empty());
    }

    #[test]
    fn hazards_chase_once_per_second() {
        let mut state = calm();
        let mut rng = rng();
        state.hazards.push(Pos::new(0, 0));
        for _ in 0..59 {
            state.step(&[], DT, &mut rng);
        }
        assert_eq!(state.hazards[0], Pos::new(0, 0));
        state.step(&[], DT + 1e-9, &mut rng);
        assert_eq!(state.hazards[0], Pos::new(1, 1));
    }

    #[test]
    fn stats_decay_and_starvation_drains_health() {
        let mut state = calm();
        let mut rng = rng();
        state.player.food = 1;
        state.step(&[], 1.0, &mut rng);
        assert_eq!(state.player.food, 0);
        assert_eq!(state.player.water, 99);
        assert_eq!(state.player.health, 99);
    }

    #[test]
    fn branch_falls_after_delay_and_hits() {
        let mut state = calm();
        let mut rng = rng();
        let here = state.player.pos;
        state.branches.push(Branch {
            pos: Pos::new(here.x, here.y - 2),
            fall_timer: 0.5,
        });
        state.step(&[], 0.25, &mut rng);
        assert_eq!(state.branches[0].pos.y, here.y - 2);
        state.step(&[], 0.25, &mut rng);
        assert_eq!(state.branches[0].pos.y, here.y - 1);
        let events = state.step(&[], DT, &mut rng);
        assert!(state.branches.is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            SurvivalEvent::Damaged {
                source: DamageSource::Branch,
                ..
            }
        )));
        assert_eq!(state.player.health, 80);
    }

    #[test]
    fn gun_pickup_caps_ammo() {
        let mut state = calm();
        let mut rng = rng();
        state.player.ammo = 4;
        state.guns.push(state.player.pos);
        state.step(&[], DT, &mut rng);
        assert_eq!(state.player.ammo, 10);
    }

    #[test]
    fn shooting_needs_ammo_facing_and_cooldown() {
        let mut state = calm();
        let mut rng = rng();
        let events = state.step(&[SurvivalCommand::Shoot], DT, &mut rng);
        assert!(events.is_empty());

        state.player.ammo = 2;
        state.step(&[SurvivalCommand::Move { dx: 0, dy: -1 }], DT, &mut rng);
        let events = state.step(&[SurvivalCommand::Shoot], DT, &mut rng);
        assert!(events.contains(&SurvivalEvent::ShotFired));
        let events = state.step(&[SurvivalCommand::Shoot], DT, &mut rng);
        assert!(!events.contains(&SurvivalEvent::ShotFired));
        assert_eq!(state.player.ammo, 1);
    }

    #[test]
    fn bullet_destroys_hazard_on_landing_cell() {
        let mut state = SurvivalState::new(SurvivalConfig {
            max_resources: 0,
            max_guns: 0,
            hazard_spawn_chance: 0.0,
            max_branches: 0,
            bullet_hit_chance: 1.0,
            hazard_move_secs: 100.0,
            ..SurvivalConfig::default()
        })
        .expect("valid config");
        let mut rng = rng();
        state.player.ammo = 1;
        state.player.facing = (1, 0);
        let target = Pos::new(state.player.pos.x + 4, state.player.pos.y);
        state.hazards.push(target);
        state.step(&[SurvivalCommand::Shoot], DT, &mut rng);
        let events = state.step(&[], DT, &mut rng);
        assert!(events.contains(&SurvivalEvent::HazardDestroyed { pos: target }));
        assert!(state.hazards.is_empty());
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn game_ends_when_health_runs_out() {
        let mut state = calm();
        let mut rng = rng();
        state.player.health = 10;
        state.hazards.push(state.player.pos);
        let events = state.step(&[], DT, &mut rng);
        assert!(state.game_over);
        assert!(matches!(events.last(), Some(SurvivalEvent::GameOver { .. })));
        assert!(state.step(&[], DT, &mut rng).is_empty());
    }

    #[test]
    fn rejects_configs_that_cannot_be_played() {
        let bad = [
            SurvivalConfig {
                width: 0,
                ..SurvivalConfig::default()
            },
            SurvivalConfig {
                height: -3,
                ..SurvivalConfig::default()
            },
            SurvivalConfig {
                branch_min_delay_secs: 9,
                branch_max_delay_secs: 3,
                ..SurvivalConfig::default()
            },
            SurvivalConfig {
                hazard_spawn_chance: 1.5,
                ..SurvivalConfig::default()
            },
            SurvivalConfig {
                bullet_hit_chance: f64::NAN,
                ..SurvivalConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                SurvivalState::new(config),
                Err(GameError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn config_from_json_is_validated() {
        let config: SurvivalConfig =
            serde_json::from_str(r#"{"width":0}"#).expect("partial config parses");
        assert!(SurvivalState::new(config).is_err());

        let config: SurvivalConfig =
            serde_json::from_str(r#"{"width":8,"height":6}"#).expect("partial config parses");
        let mut state = SurvivalState::new(config).expect("small grid is playable");
        let mut rng = rng();
        for _ in 0..120 {
            state.step(&[], DT, &mut rng);
        }
        assert!(state.resources.iter().all(|r| state.in_bounds(r.pos)));
    }
}
