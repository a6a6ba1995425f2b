use std::fmt;

use serde::{Deserialize, Serialize};

use super::tictactoe::Cell;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FormulaError {
    Empty,
    UnexpectedChar { ch: char, position: usize },
    UnexpectedToken { position: usize },
    UnexpectedEnd,
    UnbalancedParenthesis { position: usize },
    SymbolDisabled { symbol: char },
    DivisionByZero,
    InvalidFactorial { value: f64 },
    NonFinite,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Empty => write!(f, "formula is empty"),
            FormulaError::UnexpectedChar { ch, position } => {
                write!(f, "unexpected character '{ch}' at {position}")
            }
            FormulaError::UnexpectedToken { position } => {
                write!(f, "unexpected token at {position}")
            }
            FormulaError::UnexpectedEnd => write!(f, "formula ends unexpectedly"),
            FormulaError::UnbalancedParenthesis { position } => {
                write!(f, "unbalanced parenthesis at {position}")
            }
            FormulaError::SymbolDisabled { symbol } => {
                write!(f, "symbol '{symbol}' requires advanced symbols")
            }
            FormulaError::DivisionByZero => write!(f, "division by zero"),
            FormulaError::InvalidFactorial { value } => {
                write!(f, "factorial is not defined for {value}")
            }
            FormulaError::NonFinite => write!(f, "result is not a finite number"),
        }
    }
}

impl std::error::Error for FormulaError {}

/// 所有游戏共享的规则错误，可直接序列化给前端。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GameError {
    GameFinished,
    ModeNotSelected,
    NotPlayerTurn { expected: Cell },
    InvalidCell { row: usize, col: usize },
    CellOccupied { row: usize, col: usize },
    WrongCards { expected: Vec<u32>, used: Vec<f64> },
    Formula { error: FormulaError },
    InvalidConfig { reason: String },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::GameFinished => write!(f, "game is already finished"),
            GameError::ModeNotSelected => write!(f, "no game mode selected"),
            GameError::NotPlayerTurn { expected } => write!(f, "it is {expected:?}'s turn"),
            GameError::InvalidCell { row, col } => write!(f, "cell ({row}, {col}) is off the board"),
            GameError::CellOccupied { row, col } => write!(f, "cell ({row}, {col}) is occupied"),
            GameError::WrongCards { expected, used } => {
                write!(f, "formula must use the cards {expected:?}, got {used:?}")
            }
            GameError::Formula { error } => write!(f, "{error}"),
            GameError::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<FormulaError> for GameError {
    fn from(error: FormulaError) -> Self {
        GameError::Formula { error }
    }
}
