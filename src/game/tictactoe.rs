//! 5x5 井字棋：落子、胜负判定与对战模式。

use std::borrow::Cow;
use std::str::FromStr;

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;

const DEFAULT_SIZE: usize = 5;
const DEFAULT_WIN_LENGTH: usize = 4;

static DEFAULT_LINES: Lazy<Vec<Vec<usize>>> =
    Lazy::new(|| compute_lines(DEFAULT_SIZE, DEFAULT_WIN_LENGTH));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Red,
    Green,
}

impl Cell {
    pub fn opponent(self) -> Cell {
        match self {
            Cell::Red => Cell::Green,
            Cell::Green => Cell::Red,
            Cell::Empty => Cell::Empty,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Cell::Red => "Red",
            Cell::Green => "Green",
            Cell::Empty => "Empty",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TicTacToeConfig {
    pub size: usize,
    pub win_length: usize,
}

impl TicTacToeConfig {
    /// 连子数限制在 3..=棋盘边长。
    pub fn normalized(mut self) -> Result<Self, GameError> {
        if !(3..=7).contains(&self.size) {
            return Err(GameError::InvalidConfig {
                reason: format!("board size {} is outside 3..=7", self.size),
            });
        }
        self.win_length = self.win_length.clamp(3, self.size);
        Ok(self)
    }
}

impl Default for TicTacToeConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

/// 枚举所有长度为 `win_length` 的横、竖、斜线窗口（格子下标）。
fn compute_lines(size: usize, win_length: usize) -> Vec<Vec<usize>> {
    let mut lines = Vec::new();
    if win_length == 0 || win_length > size {
        return lines;
    }
    let directions: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
    for row in 0..size as isize {
        for col in 0..size as isize {
            for (dr, dc) in directions {
                let end_row = row + dr * (win_length as isize - 1);
                let end_col = col + dc * (win_length as isize - 1);
                if end_row < 0 || end_row >= size as isize || end_col < 0 || end_col >= size as isize
                {
                    continue;
                }
                let line = (0..win_length as isize)
                    .map(|step| ((row + dr * step) * size as isize + col + dc * step) as usize)
                    .collect();
                lines.push(line);
            }
        }
    }
    lines
}

pub fn win_lines(size: usize, win_length: usize) -> Cow<'static, [Vec<usize>]> {
    if size == DEFAULT_SIZE && win_length == DEFAULT_WIN_LENGTH {
        Cow::Borrowed(DEFAULT_LINES.as_slice())
    } else {
        Cow::Owned(compute_lines(size, win_length))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grid {
    pub size: usize,
    pub cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.size && col < self.size {
            Some(row * self.size + col)
        } else {
            None
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|index| self.cells[index])
    }

    pub fn empty_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_full(&self) -> bool {
        !self.cells.contains(&Cell::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| *cell == Cell::Empty)
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells.chunks(self.size).map(|row| row.to_vec()).collect()
    }
}

/// 返回获胜方及其连线。
pub fn winning_line(grid: &Grid, win_length: usize) -> Option<(Cell, Vec<usize>)> {
    win_lines(grid.size, win_length).iter().find_map(|line| {
        let first = grid.cells[line[0]];
        if first != Cell::Empty && line.iter().all(|index| grid.cells[*index] == first) {
            Some((first, line.clone()))
        } else {
            None
        }
    })
}

pub fn check_winner(grid: &Grid, win_length: usize) -> Option<Cell> {
    winning_line(grid, win_length).map(|(mark, _)| mark)
}

pub fn is_board_full(grid: &Grid) -> bool {
    grid.is_full()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Pvp,
    Pve,
}

impl FromStr for MatchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pvp" | "player_vs_player" => Ok(MatchMode::Pvp),
            "pve" | "pvai" | "player_vs_ai" => Ok(MatchMode::Pve),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    Winner { mark: Cell, line: Vec<usize> },
    Tie,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TicTacToeEvent {
    MatchStarted { mode: MatchMode, first: Cell },
    MarkPlaced { row: usize, col: usize, mark: Cell },
    TurnChanged { current: Cell },
    GameWon { winner: Cell, line: Vec<usize> },
    GameTied,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRecord {
    pub row: usize,
    pub col: usize,
    pub mark: Cell,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicTacToeState {
    #[serde(default)]
    pub config: TicTacToeConfig,
    pub board: Grid,
    pub current: Cell,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
    pub human: Cell,
    pub ai: Cell,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<MoveRecord>,
}

impl TicTacToeState {
    pub fn new(config: TicTacToeConfig) -> Result<Self, GameError> {
        let config = config.normalized()?;
        Ok(Self {
            board: Grid::new(config.size),
            config,
            current: Cell::Red,
            mode: None,
            human: Cell::Red,
            ai: Cell::Green,
            outcome: None,
            history: Vec::new(),
        })
    }

    /// 人机模式随机决定先手，双人模式红方先手。
    pub fn start<R: Rng + ?Sized>(&mut self, mode: MatchMode, rng: &mut R) -> TicTacToeEvent {
        self.board = Grid::new(self.config.size);
        self.outcome = None;
        self.history.clear();
        self.mode = Some(mode);
        self.current = match mode {
            MatchMode::Pvp => self.human,
            MatchMode::Pve => {
                if rng.gen_bool(0.5) {
                    self.human
                } else {
                    self.ai
                }
            }
        };
        TicTacToeEvent::MatchStarted {
            mode,
            first: self.current,
        }
    }

    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TicTacToeEvent, GameError> {
        let mode = self.mode.ok_or(GameError::ModeNotSelected)?;
        Ok(self.start(mode, rng))
    }

    /// 回到模式选择界面。
    pub fn quit(&mut self) {
        self.board = Grid::new(self.config.size);
        self.current = self.human;
        self.mode = None;
        self.outcome = None;
        self.history.clear();
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn ai_to_move(&self) -> bool {
        self.mode == Some(MatchMode::Pve) && self.current == self.ai && !self.is_finished()
    }

    /// 人类玩家落子；人机模式下轮到 AI 时拒绝。
    pub fn human_move(&mut self, row: usize, col: usize) -> Result<Vec<TicTacToeEvent>, GameError> {
        if self.ai_to_move() {
            return Err(GameError::NotPlayerTurn { expected: self.ai });
        }
        self.play(row, col)
    }

    pub fn play(&mut self, row: usize, col: usize) -> Result<Vec<TicTacToeEvent>, GameError> {
        if self.mode.is_none() {
            return Err(GameError::ModeNotSelected);
        }
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        let index = self
            .board
            .index(row, col)
            .ok_or(GameError::InvalidCell { row, col })?;
        if self.board.cells[index] != Cell::Empty {
            return Err(GameError::CellOccupied { row, col });
        }

        let mark = self.current;
        self.board.cells[index] = mark;
        self.history.push(MoveRecord { row, col, mark });

        let mut events = vec![TicTacToeEvent::MarkPlaced { row, col, mark }];
        if let Some((winner, line)) = winning_line(&self.board, self.config.win_length) {
            self.outcome = Some(Outcome::Winner {
                mark: winner,
                line: line.clone(),
            });
            events.push(TicTacToeEvent::GameWon { winner, line });
        } else if self.board.is_full() {
            self.outcome = Some(Outcome::Tie);
            events.push(TicTacToeEvent::GameTied);
        } else {
            self.current = self.current.opponent();
            events.push(TicTacToeEvent::TurnChanged {
                current: self.current,
            });
        }
        Ok(events)
    }

    pub fn status_text(&self) -> String {
        match &self.outcome {
            Some(Outcome::Winner { mark, .. }) => format!("{} wins!", mark.name()),
            Some(Outcome::Tie) => "It's a tie!".to_string(),
            None if self.mode.is_none() => "Choose a mode".to_string(),
            None => format!("{}'s turn", self.current.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn pvp() -> TicTacToeState {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = TicTacToeState::new(TicTacToeConfig::default()).expect("default config");
        state.start(MatchMode::Pvp, &mut rng);
        state
    }

    #[test]
    fn default_board_has_expected_line_count() {
        // 每行/列各 2 个窗口，两个斜向各 4 个
        assert_eq!(win_lines(5, 4).len(), 5 * 2 + 5 * 2 + 4 + 4);
        assert_eq!(win_lines(3, 3).len(), 8);
    }

    #[test]
    fn pvp_starts_with_red_and_alternates() {
        let mut state = pvp();
        assert_eq!(state.current, Cell::Red);
        state.play(0, 0).expect("empty cell");
        assert_eq!(state.current, Cell::Green);
        assert_eq!(state.status_text(), "Green's turn");
    }

    #[test]
    fn rejects_occupied_and_out_of_range_cells() {
        let mut state = pvp();
        state.play(2, 2).expect("empty cell");
        assert_eq!(
            state.play(2, 2),
            Err(GameError::CellOccupied { row: 2, col: 2 })
        );
        assert_eq!(
            state.play(5, 0),
            Err(GameError::InvalidCell { row: 5, col: 0 })
        );
        assert_eq!(state.current, Cell::Green);
    }

    #[test]
    fn four_in_a_diagonal_wins() {
        let mut state = pvp();
        let moves = [(0, 0), (0, 4), (1, 1), (1, 4), (2, 2), (2, 4), (3, 3)];
        let mut last = Vec::new();
        for (row, col) in moves {
            last = state.play(row, col).expect("legal move");
        }
        assert!(matches!(
            state.outcome,
            Some(Outcome::Winner { mark: Cell::Red, .. })
        ));
        assert!(last
            .iter()
            .any(|event| matches!(event, TicTacToeEvent::GameWon { winner: Cell::Red, .. })));
        assert_eq!(state.play(4, 4), Err(GameError::GameFinished));
        assert_eq!(state.status_text(), "Red wins!");
    }

    #[test]
    fn full_board_without_line_is_a_tie() {
        let config = TicTacToeConfig {
            size: 3,
            win_length: 3,
        };
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = TicTacToeState::new(config).expect("valid config");
        state.start(MatchMode::Pvp, &mut rng);
        // R G R / R G G / G R R
        for (row, col) in [(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)] {
            state.play(row, col).expect("legal move");
        }
        assert_eq!(state.outcome, Some(Outcome::Tie));
        assert_eq!(state.status_text(), "It's a tie!");
    }

    #[test]
    fn pve_first_player_varies_with_the_seed() {
        let mut firsts = Vec::new();
        for seed in 0..32 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state =
                TicTacToeState::new(TicTacToeConfig::default()).expect("default config");
            let event = state.start(MatchMode::Pve, &mut rng);
            assert_eq!(
                event,
                TicTacToeEvent::MatchStarted {
                    mode: MatchMode::Pve,
                    first: state.current,
                }
            );
            assert_eq!(state.ai_to_move(), state.current == state.ai);
            firsts.push(state.current);
        }
        assert!(firsts.contains(&Cell::Red));
        assert!(firsts.contains(&Cell::Green));
    }

    #[test]
    fn play_requires_a_mode() {
        let mut state = TicTacToeState::new(TicTacToeConfig::default()).expect("default config");
        assert_eq!(state.play(0, 0), Err(GameError::ModeNotSelected));
    }

    #[test]
    fn human_cannot_move_for_the_ai() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut state = TicTacToeState::new(TicTacToeConfig::default()).expect("default config");
        state.start(MatchMode::Pve, &mut rng);
        state.current = state.ai;
        assert_eq!(
            state.human_move(0, 0),
            Err(GameError::NotPlayerTurn { expected: Cell::Green })
        );
        assert!(state.ai_to_move());
    }

    #[test]
    fn quit_and_restart_reset_the_board() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut state = pvp();
        state.play(1, 1).expect("legal move");
        state.restart(&mut rng).expect("mode is set");
        assert!(state.board.is_empty());
        assert_eq!(state.mode, Some(MatchMode::Pvp));

        state.quit();
        assert_eq!(state.mode, None);
        assert!(state.restart(&mut rng).is_err());
    }

    #[test]
    fn win_length_is_clamped_to_board() {
        let config = TicTacToeConfig {
            size: 4,
            win_length: 9,
        }
        .normalized()
        .expect("size is valid");
        assert_eq!(config.win_length, 4);
    }
}
