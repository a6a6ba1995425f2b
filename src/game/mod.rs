//! 各个小游戏的规则引擎，与渲染、输入无关。

pub mod catalog;
pub mod duel;
pub mod error;
pub mod formula;
pub mod geometry;
pub mod survival;
pub mod tank;
pub mod tictactoe;
pub mod timestep;
pub mod twenty48;
pub mod twenty_four;

pub use catalog::{catalog, GameInfo, GameKind};
pub use duel::{DuelConfig, DuelEvent, DuelInput, DuelState, Fighter, Side};
pub use error::{FormulaError, GameError};
pub use formula::{evaluate, parse_formula, Expr};
pub use geometry::{Arena, Vec2};
pub use survival::{
    DamageSource, Pos, ResourceKind, SurvivalCommand, SurvivalConfig, SurvivalEvent,
    SurvivalState,
};
pub use tank::{Tank, TankConfig, TankEvent, TankInput, TankState};
pub use tictactoe::{
    check_winner, is_board_full, Cell, Grid, MatchMode, Outcome, TicTacToeConfig,
    TicTacToeEvent, TicTacToeState,
};
pub use timestep::{FixedTimestep, FRAMES_PER_SECOND};
pub use twenty48::{Board, Direction, MoveOutcome, Twenty48Config, Twenty48Event, Twenty48State};
pub use twenty_four::{TwentyFourConfig, TwentyFourEvent, TwentyFourState};
