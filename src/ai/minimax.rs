use std::str::FromStr;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::tictactoe::{check_winner, win_lines, Cell, Grid, TicTacToeState};
use crate::utils::Instant;

const WIN_SCORE: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub depth: u8,
    pub randomness: f64,
    pub time_limit: Duration,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            AiDifficulty::Easy => Self {
                depth: 1,
                randomness: 40.0,
                time_limit: Duration::from_millis(40),
            },
            AiDifficulty::Normal => Self {
                depth: 2,
                randomness: 8.0,
                time_limit: Duration::from_millis(90),
            },
            AiDifficulty::Hard => Self {
                depth: 3,
                randomness: 1.0,
                time_limit: Duration::from_millis(160),
            },
            AiDifficulty::Expert => Self {
                depth: 4,
                randomness: 0.0,
                time_limit: Duration::from_millis(260),
            },
        }
    }

    /// 去掉时间限制，搜索结果只取决于种子。
    pub fn without_time_limit(mut self) -> Self {
        self.time_limit = Duration::ZERO;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::Normal)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellPos>,
    pub evaluation: f64,
    pub depth_reached: u8,
    pub nodes: u64,
    pub timed_out: bool,
    pub duration_ms: u64,
}

struct SearchStats {
    nodes: u64,
    depth_reached: u8,
    timed_out: bool,
}

impl SearchStats {
    fn new() -> Self {
        Self {
            nodes: 0,
            depth_reached: 0,
            timed_out: false,
        }
    }
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn decision(
        &self,
        index: Option<usize>,
        size: usize,
        evaluation: f64,
        stats: &SearchStats,
        start: Instant,
    ) -> AiDecision {
        AiDecision {
            cell: index.map(|index| CellPos {
                row: index / size,
                col: index % size,
            }),
            evaluation,
            depth_reached: stats.depth_reached,
            nodes: stats.nodes,
            timed_out: stats.timed_out,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    pub fn decide(&mut self, state: &TicTacToeState) -> AiDecision {
        let mut stats = SearchStats::new();
        let start = Instant::now();
        let deadline = if self.config.time_limit.is_zero() {
            None
        } else {
            Some(start + self.config.time_limit)
        };

        let me = state.current;
        let win_length = state.config.win_length;
        let mut grid = state.board.clone();
        let size = grid.size;

        if state.is_finished() || grid.is_full() || me == Cell::Empty {
            let evaluation = self.evaluate(&grid, me, win_length);
            return self.decision(None, size, evaluation, &stats, start);
        }

        if grid.is_empty() {
            let center = (size / 2) * size + size / 2;
            return self.decision(Some(center), size, 0.0, &stats, start);
        }

        if let Some(index) = find_winning_cell(&mut grid, me, win_length) {
            return self.decision(Some(index), size, WIN_SCORE, &stats, start);
        }
        if self.config.depth >= 2 {
            if let Some(index) = find_winning_cell(&mut grid, me.opponent(), win_length) {
                let evaluation = self.evaluate(&grid, me, win_length);
                return self.decision(Some(index), size, evaluation, &stats, start);
            }
        }

        let mut candidates = candidate_moves(&grid);
        if self.config.randomness > 0.0 {
            candidates.shuffle(&mut self.rng);
            sort_by_center(&mut candidates, size);
        }

        let depth = self.config.depth.saturating_sub(1);
        let mut best_index = None;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_cmp = f64::NEG_INFINITY;
        let mut alpha = f64::NEG_INFINITY;
        let beta = f64::INFINITY;

        for index in candidates {
            grid.cells[index] = me;
            let score = self.minimax_rec(
                &mut grid,
                depth,
                alpha,
                beta,
                me.opponent(),
                me,
                win_length,
                deadline,
                &mut stats,
            );
            grid.cells[index] = Cell::Empty;

            if stats.timed_out && best_index.is_some() {
                break;
            }

            alpha = alpha.max(score);
            let comparison_score = score + self.random_noise();
            if comparison_score > best_cmp {
                best_cmp = comparison_score;
                best_score = score;
                best_index = Some(index);
            }
        }

        if best_index.is_none() {
            best_score = self.evaluate(&grid, me, win_length);
        }

        self.decision(best_index, size, best_score, &stats, start)
    }

    #[allow(clippy::too_many_arguments)]
    fn minimax_rec(
        &mut self,
        grid: &mut Grid,
        depth_remaining: u8,
        mut alpha: f64,
        mut beta: f64,
        to_move: Cell,
        root: Cell,
        win_length: usize,
        deadline: Option<Instant>,
        stats: &mut SearchStats,
    ) -> f64 {
        stats.nodes += 1;
        let depth_explored = self.config.depth.saturating_sub(depth_remaining);
        if depth_explored > stats.depth_reached {
            stats.depth_reached = depth_explored;
        }

        if let Some(winner) = check_winner(grid, win_length) {
            // 越早获胜分数越高
            let bonus = depth_remaining as f64;
            return if winner == root {
                WIN_SCORE + bonus
            } else {
                -WIN_SCORE - bonus
            };
        }
        if grid.is_full() {
            return 0.0;
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                stats.timed_out = true;
                return self.evaluate(grid, root, win_length);
            }
        }

        if depth_remaining == 0 {
            return self.evaluate(grid, root, win_length);
        }

        let candidates = candidate_moves(grid);
        let maximizing = to_move == root;
        let mut value = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for index in candidates {
            grid.cells[index] = to_move;
            let score = self.minimax_rec(
                grid,
                depth_remaining - 1,
                alpha,
                beta,
                to_move.opponent(),
                root,
                win_length,
                deadline,
                stats,
            );
            grid.cells[index] = Cell::Empty;

            if maximizing {
                value = value.max(score);
                alpha = alpha.max(value);
            } else {
                value = value.min(score);
                beta = beta.min(value);
            }
            if stats.timed_out || beta <= alpha {
                break;
            }
        }
        value
    }

    /// 统计所有只含单方棋子的连线窗口，子数越多权重越高。
    fn evaluate(&self, grid: &Grid, root: Cell, win_length: usize) -> f64 {
        if let Some(winner) = check_winner(grid, win_length) {
            return if winner == root { WIN_SCORE } else { -WIN_SCORE };
        }
        let opponent = root.opponent();
        let mut score = 0.0;
        for line in win_lines(grid.size, win_length).iter() {
            let mine = line.iter().filter(|i| grid.cells[**i] == root).count();
            let theirs = line.iter().filter(|i| grid.cells[**i] == opponent).count();
            if mine > 0 && theirs == 0 {
                score += window_value(mine);
            } else if theirs > 0 && mine == 0 {
                score -= window_value(theirs) * 1.1;
            }
        }
        score
    }

    fn random_noise(&mut self) -> f64 {
        if self.config.randomness <= 0.0 {
            0.0
        } else {
            (self.rng.gen::<f64>() - 0.5) * 2.0 * self.config.randomness
        }
    }
}

fn window_value(count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        10f64.powi(count as i32 - 1)
    }
}

fn find_winning_cell(grid: &mut Grid, mark: Cell, win_length: usize) -> Option<usize> {
    for index in grid.empty_indices() {
        grid.cells[index] = mark;
        let wins = check_winner(grid, win_length) == Some(mark);
        grid.cells[index] = Cell::Empty;
        if wins {
            return Some(index);
        }
    }
    None
}

fn sort_by_center(cells: &mut [usize], size: usize) {
    let center = (size as f64 - 1.0) / 2.0;
    cells.sort_by(|a, b| {
        let da = distance_to_center(*a, size, center);
        let db = distance_to_center(*b, size, center);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn distance_to_center(index: usize, size: usize, center: f64) -> f64 {
    let row = (index / size) as f64;
    let col = (index % size) as f64;
    (row - center).abs() + (col - center).abs()
}

/// 只考虑紧邻已有棋子的空格，按离中心的距离排序。
fn candidate_moves(grid: &Grid) -> Vec<usize> {
    let size = grid.size as isize;
    let mut cells: Vec<usize> = grid
        .empty_indices()
        .into_iter()
        .filter(|index| {
            let row = (*index as isize) / size;
            let col = (*index as isize) % size;
            (-1..=1).any(|dr| {
                (-1..=1).any(|dc| {
                    let (r, c) = (row + dr, col + dc);
                    (dr, dc) != (0, 0)
                        && r >= 0
                        && r < size
                        && c >= 0
                        && c < size
                        && grid.cells[(r * size + c) as usize] != Cell::Empty
                })
            })
        })
        .collect();
    if cells.is_empty() {
        cells = grid.empty_indices();
    }
    sort_by_center(&mut cells, grid.size);
    cells
}
