//! AI 算法模块：井字棋的 alpha-beta 搜索与 24 点求解。

pub mod minimax;
pub mod solver;

pub use minimax::{AiAgent, AiConfig, AiDecision, AiDifficulty, CellPos};
pub use solver::{Solution, Solver, MAX_CARDS};
