#[macro_use]
pub mod utils;
pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, AiDifficulty, CellPos, Solution, Solver};
pub use game::{
    catalog, evaluate, Direction, DuelConfig, DuelEvent, DuelInput, DuelState, FixedTimestep,
    FormulaError, GameError, GameInfo, GameKind, MatchMode, Side, SurvivalCommand,
    SurvivalConfig, SurvivalEvent, SurvivalState, TankConfig, TankEvent, TankInput, TankState,
    TicTacToeConfig, TicTacToeEvent, TicTacToeState, Twenty48Config, Twenty48Event,
    Twenty48State, TwentyFourConfig, TwentyFourEvent, TwentyFourState,
};

/// AI 落子前的默认“思考”时间。
pub const THINK_DELAY_MS: u32 = 500;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    console_log!("arcade cabinet ready: {} games", GameKind::all().len());
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    console_warn!("rejected: {error}");
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    let message = error.to_string();
    utils::error(&format!("json: {message}"));
    JsValue::from_str(&message)
}

fn unknown_value(kind: &str, value: &str) -> JsValue {
    console_warn!("unknown {kind}: {value}");
    JsValue::from_str(&format!("unknown {kind}: {value}"))
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// 空字符串与缺省都视为默认配置。
fn parse_json_or_default<T: DeserializeOwned + Default>(json: Option<String>) -> Result<T, JsValue> {
    match json.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => serde_json::from_str(text).map_err(serde_to_js_error),
        _ => Ok(T::default()),
    }
}

fn parse_difficulty(difficulty: Option<&str>) -> AiDifficulty {
    difficulty
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or(AiDifficulty::Normal)
}

/// 命令执行后返回给宿主的快照。
#[derive(Serialize)]
struct Resolution<'a, S, E> {
    state: &'a S,
    events: Vec<E>,
}

fn resolution_json<S: Serialize, E: Serialize>(state: &S, events: Vec<E>) -> Result<String, JsValue> {
    serde_json::to_string(&Resolution { state, events }).map_err(serde_to_js_error)
}

#[wasm_bindgen]
pub struct Game2048Engine {
    state: Twenty48State,
    rng: SmallRng,
}

#[wasm_bindgen]
impl Game2048Engine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: Option<String>,
        best_score: Option<u32>,
        seed: Option<u64>,
    ) -> Result<Game2048Engine, JsValue> {
        let config: Twenty48Config = parse_json_or_default(config_json)?;
        let mut rng = make_rng(seed);
        let state =
            Twenty48State::new(config, best_score.unwrap_or(0), &mut rng).map_err(to_js_error)?;
        console_log!("2048 started, best score {}", state.best_score);
        Ok(Game2048Engine { state, rng })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    /// 方向取 `up|down|left|right`，也接受 `ArrowUp` 这类键名。
    pub fn move_json(&mut self, direction: &str) -> Result<String, JsValue> {
        let direction =
            Direction::from_str(direction).map_err(|_| unknown_value("direction", direction))?;
        let outcome = self.state.apply_move(direction, &mut self.rng);
        if self.state.game_over && outcome.moved {
            console_log!("2048 over with score {}", self.state.score);
        }
        resolution_json(&self.state, outcome.events)
    }

    pub fn restart_json(&mut self) -> Result<String, JsValue> {
        self.state.restart(&mut self.rng);
        console_log!("2048 restarted");
        resolution_json::<_, Twenty48Event>(&self.state, Vec::new())
    }

    /// 最高分由宿主负责持久化。
    pub fn best_score(&self) -> u32 {
        self.state.best_score
    }

    pub fn set_best_score(&mut self, best_score: u32) {
        self.state.best_score = self.state.best_score.max(best_score);
    }
}

#[wasm_bindgen]
pub struct TwentyFourEngine {
    state: TwentyFourState,
    rng: SmallRng,
    clock: FixedTimestep,
}

#[wasm_bindgen]
impl TwentyFourEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<TwentyFourEngine, JsValue> {
        let config: TwentyFourConfig = parse_json_or_default(config_json)?;
        let mut rng = make_rng(seed);
        let state = TwentyFourState::new(config, &mut rng).map_err(to_js_error)?;
        console_log!("24 dealt {:?}", state.cards);
        Ok(TwentyFourEngine {
            state,
            rng,
            clock: FixedTimestep::default(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn submit_json(&mut self, formula: &str) -> Result<String, JsValue> {
        let events = self
            .state
            .submit(formula, &mut self.rng)
            .map_err(to_js_error)?;
        resolution_json(&self.state, events)
    }

    pub fn redraw_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.redraw(&mut self.rng).map_err(to_js_error)?;
        resolution_json(&self.state, vec![event])
    }

    pub fn reveal_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.reveal_solution();
        resolution_json(&self.state, vec![event])
    }

    pub fn toggle_advanced_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.toggle_advanced_symbols();
        console_log!("24 advanced symbols: {}", self.state.advanced_symbols);
        resolution_json(&self.state, vec![event])
    }

    pub fn toggle_timed_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.toggle_timed_mode();
        console_log!("24 timed mode: {}", self.state.timed_mode);
        resolution_json(&self.state, vec![event])
    }

    pub fn reset_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.reset(&mut self.rng);
        self.clock.reset();
        console_log!("24 reset");
        resolution_json(&self.state, vec![event])
    }

    /// 推进倒计时、提示与闪烁效果。按固定步长推进，提示的持续时间与刷新率无关。
    pub fn frame(&mut self, elapsed_ms: f64) -> Result<String, JsValue> {
        let step_ms = self.clock.step_ms;
        let mut events = Vec::new();
        for _ in 0..self.clock.advance(elapsed_ms) {
            events.extend(self.state.tick(step_ms));
        }
        if events
            .iter()
            .any(|event| matches!(event, TwentyFourEvent::TimeUp { .. }))
        {
            console_log!("24 time up, solved {}", self.state.solved_count);
        }
        resolution_json(&self.state, events)
    }

    pub fn timer_text(&self) -> String {
        self.state.timer_text()
    }
}

#[derive(Serialize)]
struct AiMoveResponse<'a> {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<Resolution<'a, TicTacToeState, TicTacToeEvent>>,
}

#[wasm_bindgen]
pub struct TicTacToeEngine {
    state: TicTacToeState,
    rng: SmallRng,
}

impl TicTacToeEngine {
    fn ensure_ai_turn(&self) -> Result<(), GameError> {
        if self.state.is_finished() {
            return Err(GameError::GameFinished);
        }
        if self.state.mode.is_none() {
            return Err(GameError::ModeNotSelected);
        }
        if !self.state.ai_to_move() {
            return Err(GameError::NotPlayerTurn {
                expected: self.state.current,
            });
        }
        Ok(())
    }

    fn log_outcome(&self, events: &[TicTacToeEvent]) {
        for event in events {
            match event {
                TicTacToeEvent::GameWon { winner, .. } => {
                    console_log!("tic-tac-toe won by {}", winner.name())
                }
                TicTacToeEvent::GameTied => console_log!("tic-tac-toe tied"),
                _ => {}
            }
        }
    }
}

#[wasm_bindgen]
impl TicTacToeEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<TicTacToeEngine, JsValue> {
        let config: TicTacToeConfig = parse_json_or_default(config_json)?;
        let state = TicTacToeState::new(config).map_err(to_js_error)?;
        Ok(TicTacToeEngine {
            state,
            rng: make_rng(seed),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    /// `mode` 取 `pvp` 或 `pve`。
    pub fn start_json(&mut self, mode: &str) -> Result<String, JsValue> {
        let mode = MatchMode::from_str(mode).map_err(|_| unknown_value("mode", mode))?;
        let event = self.state.start(mode, &mut self.rng);
        console_log!("tic-tac-toe started: {:?}, {} first", mode, self.state.current.name());
        resolution_json(&self.state, vec![event])
    }

    pub fn restart_json(&mut self) -> Result<String, JsValue> {
        let event = self.state.restart(&mut self.rng).map_err(to_js_error)?;
        console_log!("tic-tac-toe restarted");
        resolution_json(&self.state, vec![event])
    }

    pub fn quit_json(&mut self) -> Result<String, JsValue> {
        self.state.quit();
        resolution_json::<_, TicTacToeEvent>(&self.state, Vec::new())
    }

    pub fn play_json(&mut self, row: usize, col: usize) -> Result<String, JsValue> {
        let events = self.state.human_move(row, col).map_err(to_js_error)?;
        self.log_outcome(&events);
        resolution_json(&self.state, events)
    }

    pub fn ai_to_move(&self) -> bool {
        self.state.ai_to_move()
    }

    /// 同步计算并落下 AI 的一步。
    pub fn apply_ai_move(&mut self, difficulty: Option<String>) -> Result<String, JsValue> {
        self.ensure_ai_turn().map_err(to_js_error)?;
        let config = AiConfig::from_difficulty(parse_difficulty(difficulty.as_deref()));
        let mut agent = AiAgent::new(config);
        let decision = agent.decide(&self.state);

        let applied = match decision.cell {
            Some(cell) => {
                let events = self.state.play(cell.row, cell.col).map_err(to_js_error)?;
                console_log!(
                    "tic-tac-toe AI played ({}, {}) after {} nodes",
                    cell.row,
                    cell.col,
                    decision.nodes
                );
                self.log_outcome(&events);
                Some(events)
            }
            None => None,
        };

        let response = AiMoveResponse {
            decision,
            applied: applied.map(|events| Resolution {
                state: &self.state,
                events,
            }),
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 延迟 `delay_ms`（默认 500ms）后给出 AI 的决策，由宿主通过 `commit_ai_move_json` 落子。
    pub fn think_ai(&self, difficulty: Option<String>, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        let difficulty = parse_difficulty(difficulty.as_deref());
        let delay = delay_ms.unwrap_or(THINK_DELAY_MS);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(AiConfig::from_difficulty(difficulty));
            let decision = agent.decide(&state);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn commit_ai_move_json(&mut self, row: usize, col: usize) -> Result<String, JsValue> {
        self.ensure_ai_turn().map_err(to_js_error)?;
        let events = self.state.play(row, col).map_err(to_js_error)?;
        self.log_outcome(&events);
        resolution_json(&self.state, events)
    }

    pub fn status_text(&self) -> String {
        self.state.status_text()
    }
}

#[wasm_bindgen]
pub struct DuelEngine {
    state: DuelState,
    rng: SmallRng,
    clock: FixedTimestep,
    pending_fire: Option<game::Vec2>,
}

#[wasm_bindgen]
impl DuelEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<DuelEngine, JsValue> {
        let config: DuelConfig = parse_json_or_default(config_json)?;
        Ok(DuelEngine {
            state: DuelState::new(config).map_err(to_js_error)?,
            rng: make_rng(seed),
            clock: FixedTimestep::default(),
            pending_fire: None,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn restart_json(&mut self) -> Result<String, JsValue> {
        self.state.restart();
        self.clock.reset();
        self.pending_fire = None;
        console_log!("duel restarted");
        resolution_json::<_, DuelEvent>(&self.state, Vec::new())
    }

    /// 点击只触发一次射击；若本帧不足一个步长则留到下一步。
    pub fn frame(&mut self, elapsed_ms: f64, input_json: Option<String>) -> Result<String, JsValue> {
        let input: DuelInput = parse_json_or_default(input_json)?;
        if input.fire_at.is_some() {
            self.pending_fire = input.fire_at;
        }
        let mut events = Vec::new();
        for _ in 0..self.clock.advance(elapsed_ms) {
            let step_input = DuelInput {
                fire_at: self.pending_fire.take(),
                ..input.clone()
            };
            events.extend(self.state.step(&step_input, &mut self.rng));
        }
        if let Some(text) = self.state.status_text() {
            if events
                .iter()
                .any(|event| matches!(event, DuelEvent::DuelOver { .. }))
            {
                console_log!("{text}");
            }
        }
        resolution_json(&self.state, events)
    }
}

#[wasm_bindgen]
pub struct TankEngine {
    state: TankState,
    clock: FixedTimestep,
    pending_fire: bool,
}

#[wasm_bindgen]
impl TankEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<TankEngine, JsValue> {
        let config: TankConfig = parse_json_or_default(config_json)?;
        Ok(TankEngine {
            state: TankState::new(config).map_err(to_js_error)?,
            clock: FixedTimestep::default(),
            pending_fire: false,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn restart_json(&mut self) -> Result<String, JsValue> {
        self.state.restart();
        self.clock.reset();
        self.pending_fire = false;
        console_log!("tank battle restarted");
        resolution_json::<_, TankEvent>(&self.state, Vec::new())
    }

    pub fn frame(&mut self, elapsed_ms: f64, input_json: Option<String>) -> Result<String, JsValue> {
        let input: TankInput = parse_json_or_default(input_json)?;
        self.pending_fire |= input.fire;
        let dt_secs = self.clock.step_secs();
        let mut events = Vec::new();
        for _ in 0..self.clock.advance(elapsed_ms) {
            let step_input = TankInput {
                fire: std::mem::take(&mut self.pending_fire),
                ..input.clone()
            };
            events.extend(self.state.step(&step_input, dt_secs));
        }
        if events
            .iter()
            .any(|event| matches!(event, TankEvent::BattleOver { .. }))
        {
            if let Some(text) = self.state.status_text() {
                console_log!("{text}");
            }
        }
        resolution_json(&self.state, events)
    }
}

#[wasm_bindgen]
pub struct SurvivalEngine {
    state: SurvivalState,
    rng: SmallRng,
    clock: FixedTimestep,
    pending: Vec<SurvivalCommand>,
}

#[wasm_bindgen]
impl SurvivalEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<SurvivalEngine, JsValue> {
        let config: SurvivalConfig = parse_json_or_default(config_json)?;
        Ok(SurvivalEngine {
            state: SurvivalState::new(config).map_err(to_js_error)?,
            rng: make_rng(seed),
            clock: FixedTimestep::default(),
            pending: Vec::new(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn restart_json(&mut self) -> Result<String, JsValue> {
        self.state.restart();
        self.clock.reset();
        self.pending.clear();
        console_log!("survival restarted");
        resolution_json::<_, SurvivalEvent>(&self.state, Vec::new())
    }

    /// `input_json` 是本帧按下的命令数组，例如 `[{"type":"Move","dx":1,"dy":0}]`。
    pub fn frame(&mut self, elapsed_ms: f64, input_json: Option<String>) -> Result<String, JsValue> {
        let commands: Vec<SurvivalCommand> = parse_json_or_default(input_json)?;
        self.pending.extend(commands);
        let dt_secs = self.clock.step_secs();
        let mut events = Vec::new();
        for _ in 0..self.clock.advance(elapsed_ms) {
            let commands = std::mem::take(&mut self.pending);
            events.extend(self.state.step(&commands, dt_secs, &mut self.rng));
        }
        for event in &events {
            if let SurvivalEvent::GameOver { survived_secs } = event {
                console_log!("survival over after {:.1}s", survived_secs);
            }
        }
        resolution_json(&self.state, events)
    }
}

/// 返回所有可玩游戏的描述。
#[wasm_bindgen(js_name = "listGames")]
pub fn list_games() -> Result<JsValue, JsValue> {
    to_value(&catalog()).map_err(JsValue::from)
}

/// 求一组牌的 24 点解，无解时返回 `undefined`。
#[wasm_bindgen(js_name = "solve24")]
pub fn solve_24(cards: Vec<u32>, advanced: bool) -> Result<JsValue, JsValue> {
    Solver::validate_hand(&cards).map_err(to_js_error)?;
    let solution = Solver::new(24.0, advanced).solve(&cards);
    to_value(&solution).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "evaluateFormula")]
pub fn evaluate_formula(formula: &str, advanced: bool) -> Result<f64, JsValue> {
    evaluate(formula, advanced).map_err(to_js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game::twenty_four::Message;

    fn events_of(resolution: &str) -> Vec<serde_json::Value> {
        let value: serde_json::Value =
            serde_json::from_str(resolution).expect("resolution is json");
        value["events"].as_array().cloned().unwrap_or_default()
    }

    #[test]
    fn twenty_four_message_lasts_three_seconds_at_any_refresh_rate() {
        for hz in [30.0, 60.0, 144.0] {
            let mut engine = TwentyFourEngine::new(None, Some(7)).expect("default config");
            engine.state.message = Some(Message {
                text: "Correct!".into(),
                frames_left: 180,
            });
            let frame_ms = 1000.0 / hz;
            let mut elapsed = 0.0;
            while engine.state.message.is_some() && elapsed < 10_000.0 {
                engine.frame(frame_ms).expect("frame");
                elapsed += frame_ms;
            }
            assert!(
                (elapsed - 3000.0).abs() <= 1000.0 / 30.0,
                "{hz} Hz cleared after {elapsed} ms"
            );
        }
    }

    #[test]
    fn duel_click_between_steps_fires_on_the_next_step() {
        let mut engine = DuelEngine::new(Some(r#"{"enemy_fire_chance":0.0}"#.into()), Some(1))
            .expect("valid config");
        let click = Some(r#"{"fire_at":{"x":500.0,"y":300.0}}"#.to_string());
        engine.frame(5.0, click).expect("short frame");
        assert!(engine.state.bullets.is_empty());
        assert!(engine.pending_fire.is_some());

        let resolution = engine.frame(15.0, None).expect("step frame");
        assert!(engine.pending_fire.is_none());
        assert_eq!(engine.state.bullets.len(), 1);
        assert_eq!(engine.state.player.ammo, 29);
        assert!(events_of(&resolution)
            .iter()
            .any(|event| event["type"] == "ShotFired"));

        engine.frame(20.0, None).expect("later frame");
        assert_eq!(engine.state.player.ammo, 29);
    }

    #[test]
    fn tank_fire_between_steps_is_kept_for_one_shot() {
        let mut engine = TankEngine::new(Some(r#"{"enemy_fire_interval_secs":1000.0}"#.into()))
            .expect("valid config");
        engine
            .frame(5.0, Some(r#"{"fire":true}"#.into()))
            .expect("short frame");
        assert!(engine.state.shells.is_empty());
        assert!(engine.pending_fire);

        let resolution = engine.frame(15.0, None).expect("step frame");
        assert!(!engine.pending_fire);
        let fired = events_of(&resolution)
            .iter()
            .filter(|event| event["type"] == "ShellFired")
            .count();
        assert_eq!(fired, 1);
        assert_eq!(engine.state.shells.len(), 1);

        let resolution = engine.frame(50.0, None).expect("catch-up frame");
        assert!(events_of(&resolution)
            .iter()
            .all(|event| event["type"] != "ShellFired"));
    }
}
