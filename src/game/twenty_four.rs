//! 24 点：发牌、提交算式、计时模式与提示信息。

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;
use super::formula::parse_formula;
use super::timestep::FRAMES_PER_SECOND;
use crate::ai::solver::{Solver, MAX_CARDS, TOLERANCE};

const DEFAULT_CARD_COUNT: usize = 4;
const DEFAULT_MIN_CARD: u32 = 1;
const DEFAULT_MAX_CARD: u32 = 13;
const DEFAULT_TARGET: u32 = 24;
const DEFAULT_TIME_LIMIT_SECS: u32 = 300;
const DEFAULT_MESSAGE_FRAMES: u32 = 3 * FRAMES_PER_SECOND;
const DEFAULT_FLASH_MS: f64 = 500.0;
const DEFAULT_MAX_DEAL_ATTEMPTS: u32 = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TwentyFourConfig {
    pub card_count: usize,
    pub min_card: u32,
    pub max_card: u32,
    pub target: u32,
    pub time_limit_secs: u32,
    pub message_frames: u32,
    pub flash_ms: f64,
    pub require_solvable: bool,
    pub max_deal_attempts: u32,
}

impl TwentyFourConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.card_count == 0 || self.card_count > MAX_CARDS {
            return Err(GameError::InvalidConfig {
                reason: format!("card_count {} is outside 1..={MAX_CARDS}", self.card_count),
            });
        }
        if self.min_card > self.max_card {
            return Err(GameError::InvalidConfig {
                reason: "min_card exceeds max_card".into(),
            });
        }
        Ok(())
    }
}

impl Default for TwentyFourConfig {
    fn default() -> Self {
        Self {
            card_count: DEFAULT_CARD_COUNT,
            min_card: DEFAULT_MIN_CARD,
            max_card: DEFAULT_MAX_CARD,
            target: DEFAULT_TARGET,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            message_frames: DEFAULT_MESSAGE_FRAMES,
            flash_ms: DEFAULT_FLASH_MS,
            require_solvable: true,
            max_deal_attempts: DEFAULT_MAX_DEAL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashColor {
    Green,
    Red,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flash {
    pub color: FlashColor,
    pub remaining_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub text: String,
    pub frames_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TwentyFourEvent {
    CardsDealt { cards: Vec<u32> },
    Solved { formula: String, solved_count: u32 },
    WrongAnswer { formula: String, value: f64 },
    SolutionRevealed { text: String },
    TimedModeChanged { enabled: bool },
    AdvancedSymbolsChanged { enabled: bool },
    TimeUp { solved_count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwentyFourState {
    #[serde(default)]
    pub config: TwentyFourConfig,
    pub cards: Vec<u32>,
    pub timed_mode: bool,
    pub countdown_secs: u32,
    #[serde(default)]
    pub second_ms: f64,
    pub solved_count: u32,
    pub advanced_symbols: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_solution: Option<String>,
    pub finished: bool,
}

impl TwentyFourState {
    pub fn new<R: Rng + ?Sized>(config: TwentyFourConfig, rng: &mut R) -> Result<Self, GameError> {
        config.validate()?;
        let mut state = Self {
            countdown_secs: config.time_limit_secs,
            config,
            cards: Vec::new(),
            timed_mode: false,
            second_ms: 0.0,
            solved_count: 0,
            advanced_symbols: false,
            message: None,
            flash: None,
            revealed_solution: None,
            finished: false,
        };
        state.deal(rng);
        Ok(state)
    }

    pub fn solver(&self) -> Solver {
        Solver::new(self.config.target as f64, self.advanced_symbols)
    }

    /// 发牌；要求有解时最多重抽 `max_deal_attempts` 次，仍无解则保留最后一手。
    pub fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TwentyFourEvent {
        let solver = self.solver();
        let attempts = if self.config.require_solvable {
            self.config.max_deal_attempts.max(1)
        } else {
            1
        };
        for _ in 0..attempts {
            self.cards = (0..self.config.card_count)
                .map(|_| rng.gen_range(self.config.min_card..=self.config.max_card))
                .collect();
            if !self.config.require_solvable || solver.is_solvable(&self.cards) {
                break;
            }
        }
        self.revealed_solution = None;
        TwentyFourEvent::CardsDealt {
            cards: self.cards.clone(),
        }
    }

    pub fn redraw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TwentyFourEvent, GameError> {
        if self.finished {
            return Err(GameError::GameFinished);
        }
        Ok(self.deal(rng))
    }

    fn show_message(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            frames_left: self.config.message_frames,
        });
    }

    fn start_flash(&mut self, color: FlashColor) {
        self.flash = Some(Flash {
            color,
            remaining_ms: self.config.flash_ms,
        });
    }

    /// 校验算式恰好用到了发出的牌（作为多重集合）。
    fn uses_dealt_cards(&self, literals: &[f64]) -> bool {
        let mut used: Vec<f64> = literals.to_vec();
        let mut dealt: Vec<f64> = self.cards.iter().map(|card| *card as f64).collect();
        if used.len() != dealt.len() {
            return false;
        }
        used.sort_by(|a, b| a.total_cmp(b));
        dealt.sort_by(|a, b| a.total_cmp(b));
        used == dealt
    }

    pub fn submit<R: Rng + ?Sized>(
        &mut self,
        formula: &str,
        rng: &mut R,
    ) -> Result<Vec<TwentyFourEvent>, GameError> {
        if self.finished {
            return Err(GameError::GameFinished);
        }

        let expr = match parse_formula(formula, self.advanced_symbols) {
            Ok(expr) => expr,
            Err(error) => {
                self.start_flash(FlashColor::Red);
                self.show_message(format!("Invalid formula: {error}"));
                return Err(error.into());
            }
        };

        let literals = expr.literals();
        if !self.uses_dealt_cards(&literals) {
            self.start_flash(FlashColor::Red);
            self.show_message("Use each card exactly once");
            return Err(GameError::WrongCards {
                expected: self.cards.clone(),
                used: literals,
            });
        }

        let value = match expr.eval() {
            Ok(value) => value,
            Err(error) => {
                self.start_flash(FlashColor::Red);
                self.show_message(format!("Invalid formula: {error}"));
                return Err(error.into());
            }
        };

        let mut events = Vec::new();
        if (value - self.config.target as f64).abs() < TOLERANCE {
            self.solved_count += 1;
            self.start_flash(FlashColor::Green);
            self.show_message("Correct!");
            events.push(TwentyFourEvent::Solved {
                formula: formula.to_string(),
                solved_count: self.solved_count,
            });
            events.push(self.deal(rng));
        } else {
            self.start_flash(FlashColor::Red);
            self.show_message("Incorrect, try again");
            events.push(TwentyFourEvent::WrongAnswer {
                formula: formula.to_string(),
                value,
            });
        }
        Ok(events)
    }

    pub fn reveal_solution(&mut self) -> TwentyFourEvent {
        let text = self.solver().reveal(&self.cards);
        self.revealed_solution = Some(text.clone());
        TwentyFourEvent::SolutionRevealed { text }
    }

    pub fn toggle_advanced_symbols(&mut self) -> TwentyFourEvent {
        self.advanced_symbols = !self.advanced_symbols;
        TwentyFourEvent::AdvancedSymbolsChanged {
            enabled: self.advanced_symbols,
        }
    }

    /// 开启计时时倒计时重置为完整时长。
    pub fn toggle_timed_mode(&mut self) -> TwentyFourEvent {
        self.timed_mode = !self.timed_mode;
        if self.timed_mode {
            self.countdown_secs = self.config.time_limit_secs;
            self.second_ms = 0.0;
            self.finished = false;
        }
        TwentyFourEvent::TimedModeChanged {
            enabled: self.timed_mode,
        }
    }

    /// 重新开始一局：清零计数与倒计时并发新牌。
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TwentyFourEvent {
        self.countdown_secs = self.config.time_limit_secs;
        self.second_ms = 0.0;
        self.solved_count = 0;
        self.finished = false;
        self.message = None;
        self.flash = None;
        self.deal(rng)
    }

    /// 推进一帧：`dt_ms` 为本帧时长，消息计时按帧递减。
    pub fn tick(&mut self, dt_ms: f64) -> Vec<TwentyFourEvent> {
        let mut events = Vec::new();
        if !dt_ms.is_finite() || dt_ms < 0.0 {
            return events;
        }

        if let Some(flash) = self.flash.as_mut() {
            flash.remaining_ms -= dt_ms;
            if flash.remaining_ms <= 0.0 {
                self.flash = None;
            }
        }

        if let Some(message) = self.message.as_mut() {
            message.frames_left = message.frames_left.saturating_sub(1);
            if message.frames_left == 0 {
                self.message = None;
            }
        }

        if self.timed_mode && !self.finished {
            self.second_ms += dt_ms;
            while self.second_ms >= 1000.0 && self.countdown_secs > 0 {
                self.second_ms -= 1000.0;
                self.countdown_secs -= 1;
            }
            if self.countdown_secs == 0 {
                self.finished = true;
                events.push(TwentyFourEvent::TimeUp {
                    solved_count: self.solved_count,
                });
            }
        }

        events
    }

    /// 计时器文本，未计时显示 `--:--`。
    pub fn timer_text(&self) -> String {
        if self.timed_mode {
            format!(
                "Time: {:02}:{:02}",
                self.countdown_secs / 60,
                self.countdown_secs % 60
            )
        } else {
            "Time: --:--".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn session(cards: &[u32]) -> (TwentyFourState, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(24);
        let mut state =
            TwentyFourState::new(TwentyFourConfig::default(), &mut rng).expect("default config");
        state.cards = cards.to_vec();
        (state, rng)
    }

    #[test]
    fn deals_solvable_cards_in_range() {
        let mut rng = SmallRng::seed_from_u64(99);
        let state =
            TwentyFourState::new(TwentyFourConfig::default(), &mut rng).expect("default config");
        assert_eq!(state.cards.len(), 4);
        assert!(state.cards.iter().all(|card| (1..=13).contains(card)));
        assert!(state.solver().is_solvable(&state.cards));
    }

    #[test]
    fn correct_formula_scores_and_redeals() {
        let (mut state, mut rng) = session(&[4, 7, 8, 8]);
        let events = state
            .submit("(7 - 8 / 8) * 4", &mut rng)
            .expect("formula uses the dealt cards");
        assert_eq!(state.solved_count, 1);
        assert!(matches!(events[0], TwentyFourEvent::Solved { solved_count: 1, .. }));
        assert!(matches!(events[1], TwentyFourEvent::CardsDealt { .. }));
        assert_eq!(
            state.flash.as_ref().map(|flash| flash.color),
            Some(FlashColor::Green)
        );
        assert_eq!(
            state.message.as_ref().map(|message| message.text.as_str()),
            Some("Correct!")
        );
    }

    #[test]
    fn wrong_value_keeps_cards() {
        let (mut state, mut rng) = session(&[4, 7, 8, 8]);
        let events = state
            .submit("4 + 7 + 8 + 8", &mut rng)
            .expect("formula is well formed");
        assert!(matches!(events[0], TwentyFourEvent::WrongAnswer { value, .. } if value == 27.0));
        assert_eq!(state.cards, vec![4, 7, 8, 8]);
        assert_eq!(state.solved_count, 0);
        assert_eq!(
            state.flash.as_ref().map(|flash| flash.color),
            Some(FlashColor::Red)
        );
    }

    #[test]
    fn formula_must_use_each_card_once() {
        let (mut state, mut rng) = session(&[4, 7, 8, 8]);
        let result = state.submit("8 * 3", &mut rng);
        assert!(matches!(result, Err(GameError::WrongCards { .. })));
        let result = state.submit("(7 - 8 / 8) * 4 * 1", &mut rng);
        assert!(matches!(result, Err(GameError::WrongCards { .. })));
    }

    #[test]
    fn advanced_symbols_gate_the_parser() {
        let (mut state, mut rng) = session(&[1, 2, 3, 4]);
        state.config.target = 24;
        let result = state.submit("4! * (3 - 2) ^ 1", &mut rng);
        assert!(matches!(result, Err(GameError::Formula { .. })));

        state.toggle_advanced_symbols();
        state
            .submit("4! * (3 - 2) ^ 1", &mut rng)
            .expect("advanced symbols allowed");
        assert_eq!(state.solved_count, 1);
    }

    #[test]
    fn reveal_reports_solution_or_absence() {
        let (mut state, _) = session(&[1, 1, 1, 1]);
        assert_eq!(
            state.reveal_solution(),
            TwentyFourEvent::SolutionRevealed {
                text: "No solution exists".into()
            }
        );
        state.cards = vec![6, 6, 6, 6];
        state.reveal_solution();
        let text = state.revealed_solution.clone().expect("stored");
        assert!(text.ends_with("= 24"));
    }

    #[test]
    fn countdown_runs_only_in_timed_mode() {
        let (mut state, _) = session(&[6, 6, 6, 6]);
        state.tick(5_000.0);
        assert_eq!(state.countdown_secs, 300);
        assert_eq!(state.timer_text(), "Time: --:--");

        state.toggle_timed_mode();
        state.tick(1_500.0);
        assert_eq!(state.countdown_secs, 299);
        assert_eq!(state.timer_text(), "Time: 04:59");

        let events = state.tick(400_000.0);
        assert!(state.finished);
        assert!(matches!(events[0], TwentyFourEvent::TimeUp { .. }));
    }

    #[test]
    fn bad_frame_durations_do_not_move_the_clock() {
        let (mut state, _) = session(&[6, 6, 6, 6]);
        state.toggle_timed_mode();
        state.tick(600.0);
        for dt in [f64::NAN, -5_000.0, f64::NEG_INFINITY, f64::INFINITY] {
            assert!(state.tick(dt).is_empty());
        }
        assert_eq!(state.countdown_secs, 300);
        assert!(!state.finished);
        state.tick(400.0);
        assert_eq!(state.countdown_secs, 299);
    }

    #[test]
    fn message_and_flash_expire() {
        let (mut state, mut rng) = session(&[4, 7, 8, 8]);
        state.submit("4 + 7 + 8 + 8", &mut rng).expect("well formed");
        for _ in 0..179 {
            state.tick(1000.0 / 60.0);
        }
        assert!(state.message.is_some());
        assert!(state.flash.is_none());
        state.tick(1000.0 / 60.0);
        assert!(state.message.is_none());
    }

    #[test]
    fn finished_session_rejects_input() {
        let (mut state, mut rng) = session(&[6, 6, 6, 6]);
        state.finished = true;
        assert_eq!(
            state.submit("6+6+6+6", &mut rng),
            Err(GameError::GameFinished)
        );
        state.reset(&mut rng);
        assert!(!state.finished);
        assert_eq!(state.solved_count, 0);
    }
}
