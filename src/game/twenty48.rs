//! 2048：滑动合并规则与计分。

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;

const DEFAULT_SIZE: usize = 4;
const DEFAULT_FOUR_PROBABILITY: f64 = 0.1;
const DEFAULT_INITIAL_TILES: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "arrowup" => Ok(Direction::Up),
            "down" | "arrowdown" => Ok(Direction::Down),
            "left" | "arrowleft" => Ok(Direction::Left),
            "right" | "arrowright" => Ok(Direction::Right),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Twenty48Config {
    pub size: usize,
    pub four_probability: f64,
    pub initial_tiles: u8,
}

impl Twenty48Config {
    pub fn validate(&self) -> Result<(), GameError> {
        if !(2..=8).contains(&self.size) {
            return Err(GameError::InvalidConfig {
                reason: format!("board size {} is outside 2..=8", self.size),
            });
        }
        if !(0.0..=1.0).contains(&self.four_probability) {
            return Err(GameError::InvalidConfig {
                reason: "four_probability must lie in [0, 1]".into(),
            });
        }
        if self.initial_tiles as usize > self.size * self.size {
            return Err(GameError::InvalidConfig {
                reason: "more initial tiles than cells".into(),
            });
        }
        Ok(())
    }
}

impl Default for Twenty48Config {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            four_probability: DEFAULT_FOUR_PROBABILITY,
            initial_tiles: DEFAULT_INITIAL_TILES,
        }
    }
}

/// 方形棋盘，按行存储，0 表示空格。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pub size: usize,
    pub cells: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Merge {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideResult {
    pub board: Board,
    pub gained: u32,
    pub changed: bool,
    pub merges: Vec<Merge>,
}

impl Board {
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn from_rows(rows: &[Vec<u32>]) -> Self {
        let size = rows.len();
        let cells = rows
            .iter()
            .flat_map(|row| row.iter().copied().chain(std::iter::repeat(0)).take(size))
            .collect();
        Self { size, cells }
    }

    pub fn rows(&self) -> Vec<Vec<u32>> {
        self.cells.chunks(self.size).map(|row| row.to_vec()).collect()
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.cells[row * self.size + col] = value;
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, value)| **value == 0)
            .map(|(index, _)| (index / self.size, index % self.size))
            .collect()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// 第 `line` 条线上的格子坐标，从移动方向的前沿开始排列。
    fn line_positions(&self, direction: Direction, line: usize) -> Vec<(usize, usize)> {
        let n = self.size;
        match direction {
            Direction::Left => (0..n).map(|col| (line, col)).collect(),
            Direction::Right => (0..n).rev().map(|col| (line, col)).collect(),
            Direction::Up => (0..n).map(|row| (row, line)).collect(),
            Direction::Down => (0..n).rev().map(|row| (row, line)).collect(),
        }
    }

    pub fn slide(&self, direction: Direction) -> SlideResult {
        let mut board = Board::empty(self.size);
        let mut gained = 0;
        let mut merges = Vec::new();

        for line in 0..self.size {
            let positions = self.line_positions(direction, line);
            let tiles: Vec<u32> = positions
                .iter()
                .map(|&(row, col)| self.get(row, col))
                .filter(|value| *value != 0)
                .collect();

            let mut packed: Vec<(u32, bool)> = Vec::with_capacity(tiles.len());
            let mut index = 0;
            while index < tiles.len() {
                if index + 1 < tiles.len() && tiles[index] == tiles[index + 1] {
                    let value = tiles[index] * 2;
                    gained += value;
                    packed.push((value, true));
                    index += 2;
                } else {
                    packed.push((tiles[index], false));
                    index += 1;
                }
            }

            for (&(row, col), (value, merged)) in positions.iter().zip(packed) {
                board.set(row, col, value);
                if merged {
                    merges.push(Merge { row, col, value });
                }
            }
        }

        let changed = board.cells != self.cells;
        SlideResult {
            board,
            gained,
            changed,
            merges,
        }
    }

    pub fn can_move(&self, direction: Direction) -> bool {
        self.slide(direction).changed
    }

    /// 没有空格且横竖相邻的格子都不相等时游戏结束。
    pub fn is_game_over(&self) -> bool {
        if self.cells.contains(&0) {
            return false;
        }
        let n = self.size;
        for row in 0..n {
            for col in 0..n {
                let value = self.get(row, col);
                if (row + 1 < n && value == self.get(row + 1, col))
                    || (col + 1 < n && value == self.get(row, col + 1))
                {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Twenty48Event {
    TileSpawned { row: usize, col: usize, value: u32 },
    TilesMerged { row: usize, col: usize, value: u32 },
    ScoreChanged { score: u32, gained: u32 },
    BestScoreChanged { best_score: u32 },
    GameOver { score: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    pub gained: u32,
    pub events: Vec<Twenty48Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Twenty48State {
    #[serde(default)]
    pub config: Twenty48Config,
    pub board: Board,
    pub score: u32,
    pub best_score: u32,
    pub game_over: bool,
    #[serde(default)]
    pub moves: u32,
}

impl Twenty48State {
    pub fn new<R: Rng + ?Sized>(
        config: Twenty48Config,
        best_score: u32,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let mut state = Self {
            board: Board::empty(config.size),
            config,
            score: 0,
            best_score,
            game_over: false,
            moves: 0,
        };
        state.deal_initial_tiles(rng);
        Ok(state)
    }

    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.board = Board::empty(self.config.size);
        self.score = 0;
        self.game_over = false;
        self.moves = 0;
        self.deal_initial_tiles(rng);
    }

    fn deal_initial_tiles<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for _ in 0..self.config.initial_tiles {
            self.spawn_tile(rng);
        }
        self.game_over = self.board.is_game_over();
    }

    /// 随机空格中生成 2（90%）或 4（10%）。
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Twenty48Event> {
        let empty = self.board.empty_cells();
        if empty.is_empty() {
            return None;
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        let value = if rng.gen::<f64>() < self.config.four_probability {
            4
        } else {
            2
        };
        self.board.set(row, col, value);
        Some(Twenty48Event::TileSpawned { row, col, value })
    }

    pub fn apply_move<R: Rng + ?Sized>(&mut self, direction: Direction, rng: &mut R) -> MoveOutcome {
        if self.game_over {
            return MoveOutcome {
                moved: false,
                gained: 0,
                events: Vec::new(),
            };
        }

        let slide = self.board.slide(direction);
        if !slide.changed {
            return MoveOutcome {
                moved: false,
                gained: 0,
                events: Vec::new(),
            };
        }

        let mut events: Vec<Twenty48Event> = slide
            .merges
            .iter()
            .map(|merge| Twenty48Event::TilesMerged {
                row: merge.row,
                col: merge.col,
                value: merge.value,
            })
            .collect();

        self.board = slide.board;
        self.moves += 1;
        if slide.gained > 0 {
            self.score += slide.gained;
            events.push(Twenty48Event::ScoreChanged {
                score: self.score,
                gained: slide.gained,
            });
        }

        if let Some(spawned) = self.spawn_tile(rng) {
            events.push(spawned);
        }

        if self.board.is_game_over() {
            self.game_over = true;
            events.push(Twenty48Event::GameOver { score: self.score });
        }

        if self.score > self.best_score {
            self.best_score = self.score;
            events.push(Twenty48Event::BestScoreChanged {
                best_score: self.best_score,
            });
        }

        MoveOutcome {
            moved: true,
            gained: slide.gained,
            events,
        }
    }

    pub fn legal_moves(&self) -> Vec<Direction> {
        if self.game_over {
            return Vec::new();
        }
        Direction::all()
            .into_iter()
            .filter(|direction| self.board.can_move(*direction))
            .collect()
    }
}
