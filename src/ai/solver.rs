//! 24 点穷举求解：每次从剩余的数中取一对，用各运算符合并后递归，直到只剩一个数。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::game::error::GameError;
use crate::game::formula::{factorial, BinaryOp};

pub const TOLERANCE: f64 = 1e-6;
/// 求解器接受的最多手牌数。
pub const MAX_CARDS: usize = 6;
const DEFAULT_TARGET: f64 = 24.0;
const MAX_SEARCH_FACTORIAL: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Solution {
    pub expression: String,
    pub value: f64,
}

#[derive(Debug, Clone)]
struct Term {
    value: f64,
    expr: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    hit: bool,
    stop: bool,
}

fn value_key(terms: &[Term]) -> Vec<u64> {
    let mut key: Vec<u64> = terms.iter().map(|term| term.value.to_bits()).collect();
    key.sort_unstable();
    key
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Solver {
    pub target: f64,
    pub allow_advanced: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            allow_advanced: false,
        }
    }
}

impl Solver {
    pub fn new(target: f64, allow_advanced: bool) -> Self {
        Self {
            target,
            allow_advanced,
        }
    }

    fn operators(&self) -> &'static [BinaryOp] {
        if self.allow_advanced {
            &[
                BinaryOp::Add,
                BinaryOp::Sub,
                BinaryOp::Mul,
                BinaryOp::Div,
                BinaryOp::Pow,
            ]
        } else {
            &[BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div]
        }
    }

    fn hits_target(&self, value: f64) -> bool {
        (value - self.target).abs() < TOLERANCE
    }

    /// 开启高级符号时，0..=10 的整数可以额外取阶乘。
    fn with_factorial(&self, term: Term) -> Vec<Term> {
        if !self.allow_advanced || term.value > MAX_SEARCH_FACTORIAL {
            return vec![term];
        }
        match factorial(term.value) {
            Ok(value) if value != term.value => {
                let expr = if term.expr.starts_with('(') || term.expr.chars().all(|c| c.is_ascii_digit()) {
                    format!("{}!", term.expr)
                } else {
                    format!("({})!", term.expr)
                };
                vec![term, Term { value, expr }]
            }
            _ => vec![term],
        }
    }

    /// 深度优先遍历所有表达式；`visit` 返回 true 时提前结束。
    /// `dead` 记录已确认凑不出目标的数值组合，与表达式写法无关。
    fn search(
        &self,
        terms: &[Term],
        dead: &mut HashSet<Vec<u64>>,
        visit: &mut dyn FnMut(&Term) -> bool,
    ) -> Progress {
        if terms.len() == 1 {
            if self.hits_target(terms[0].value) {
                return Progress {
                    hit: true,
                    stop: visit(&terms[0]),
                };
            }
            return Progress::default();
        }

        let key = (terms.len() >= 3).then(|| value_key(terms));
        if key.as_ref().is_some_and(|key| dead.contains(key)) {
            return Progress::default();
        }

        let mut progress = Progress::default();
        let mut tried: HashSet<(&str, &str)> = HashSet::new();
        for i in 0..terms.len() {
            for j in 0..terms.len() {
                if i == j || !tried.insert((terms[i].expr.as_str(), terms[j].expr.as_str())) {
                    continue;
                }
                let mut next: Vec<Term> = Vec::with_capacity(terms.len() - 1);
                next.extend(
                    terms
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| *k != i && *k != j)
                        .map(|(_, term)| term.clone()),
                );

                for &op in self.operators() {
                    // 加法与乘法满足交换律，只需一种顺序
                    if matches!(op, BinaryOp::Add | BinaryOp::Mul) && j < i {
                        continue;
                    }
                    let Ok(value) = op.apply(terms[i].value, terms[j].value) else {
                        continue;
                    };
                    let combined = Term {
                        value,
                        expr: format!("({}{}{})", terms[i].expr, op.symbol(), terms[j].expr),
                    };
                    for candidate in self.with_factorial(combined) {
                        next.push(candidate);
                        let found = self.search(&next, dead, visit);
                        next.pop();
                        progress.hit |= found.hit;
                        if found.stop {
                            progress.stop = true;
                            return progress;
                        }
                    }
                }
            }
        }
        if let Some(key) = key.filter(|_| !progress.hit) {
            dead.insert(key);
        }
        progress
    }

    fn leaf_variants(&self, cards: &[u32]) -> Vec<Vec<Term>> {
        let mut variants: Vec<Vec<Term>> = vec![Vec::new()];
        for &card in cards {
            let leaf = Term {
                value: card as f64,
                expr: card.to_string(),
            };
            let options = self.with_factorial(leaf);
            variants = variants
                .into_iter()
                .flat_map(|prefix| {
                    options.iter().map(move |option| {
                        let mut next = prefix.clone();
                        next.push(option.clone());
                        next
                    })
                })
                .collect();
        }
        variants
    }

    /// 手牌数量必须在 1..=`MAX_CARDS` 之间，否则穷举规模失控。
    pub fn validate_hand(cards: &[u32]) -> Result<(), GameError> {
        if cards.is_empty() || cards.len() > MAX_CARDS {
            return Err(GameError::InvalidConfig {
                reason: format!("hand must hold 1 to {MAX_CARDS} cards, got {}", cards.len()),
            });
        }
        Ok(())
    }

    fn walk(&self, cards: &[u32], visit: &mut dyn FnMut(&Term) -> bool) {
        if Self::validate_hand(cards).is_err() {
            return;
        }
        let mut dead = HashSet::new();
        for leaves in self.leaf_variants(cards) {
            if self.search(&leaves, &mut dead, visit).stop {
                return;
            }
        }
    }

    pub fn solve(&self, cards: &[u32]) -> Option<Solution> {
        let mut found = None;
        self.walk(cards, &mut |term| {
            found = Some(Solution {
                expression: strip_outer_parens(&term.expr).to_string(),
                value: term.value,
            });
            true
        });
        found
    }

    pub fn is_solvable(&self, cards: &[u32]) -> bool {
        self.solve(cards).is_some()
    }

    /// 统计不同写法的解，最多 `limit` 个。
    pub fn count_solutions(&self, cards: &[u32], limit: usize) -> usize {
        let mut seen = HashSet::new();
        if limit == 0 {
            return 0;
        }
        self.walk(cards, &mut |term| {
            seen.insert(term.expr.clone());
            seen.len() >= limit
        });
        seen.len()
    }

    pub fn reveal(&self, cards: &[u32]) -> String {
        match self.solve(cards) {
            Some(solution) => format!("{} = {}", solution.expression, format_target(self.target)),
            None => "No solution exists".to_string(),
        }
    }
}

fn format_target(target: f64) -> String {
    if target.fract() == 0.0 {
        format!("{}", target as i64)
    } else {
        format!("{target}")
    }
}

/// 去掉包住整个表达式的一对括号。
fn strip_outer_parens(expr: &str) -> &str {
    if !(expr.starts_with('(') && expr.ends_with(')')) {
        return expr;
    }
    let mut depth = 0i32;
    for (index, ch) in expr.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && index != expr.len() - 1 {
                    return expr;
                }
            }
            _ => {}
        }
    }
    &expr[1..expr.len() - 1]
}
