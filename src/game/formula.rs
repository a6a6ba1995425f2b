//! 24 点玩家输入的算式：词法、递归下降解析与求值。
//!
//! `^` 右结合且高于一元负号，`!` 为后缀阶乘。

use serde::{Deserialize, Serialize};

use super::error::FormulaError;

const MAX_FACTORIAL: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
        }
    }

    /// 运算失败（除零、溢出等）时返回错误，由调用方决定是否忽略。
    pub fn apply(self, lhs: f64, rhs: f64) -> Result<f64, FormulaError> {
        let value = match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => {
                if rhs == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                lhs / rhs
            }
            BinaryOp::Pow => lhs.powf(rhs),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

pub fn factorial(value: f64) -> Result<f64, FormulaError> {
    if value < 0.0 || value.fract() != 0.0 || value > MAX_FACTORIAL as f64 {
        return Err(FormulaError::InvalidFactorial { value });
    }
    Ok((1..=value as u64).product::<u64>() as f64)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Expr {
    Number { value: f64 },
    Negate { expr: Box<Expr> },
    Factorial { expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn eval(&self) -> Result<f64, FormulaError> {
        match self {
            Expr::Number { value } => Ok(*value),
            Expr::Negate { expr } => Ok(-expr.eval()?),
            Expr::Factorial { expr } => factorial(expr.eval()?),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.eval()?, rhs.eval()?),
        }
    }

    /// 算式中出现的数字，按书写顺序。
    pub fn literals(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals(&self, out: &mut Vec<f64>) {
        match self {
            Expr::Number { value } => out.push(*value),
            Expr::Negate { expr } | Expr::Factorial { expr } => expr.collect_literals(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_literals(out);
                rhs.collect_literals(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Bang,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        let position = index;
        let kind = match ch {
            c if c.is_whitespace() => {
                index += 1;
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = index;
                while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
                    index += 1;
                }
                let literal: String = chars[start..index].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::UnexpectedChar { ch, position })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position,
                });
                continue;
            }
            '+' => TokenKind::Plus,
            '-' | '−' => TokenKind::Minus,
            '*' | '×' | 'x' | 'X' => TokenKind::Star,
            '/' | '÷' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '!' => TokenKind::Bang,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position,
                })
            }
        };
        tokens.push(Token { kind, position });
        index += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    allow_advanced: bool,
}

impl Parser {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.cursor).map(|token| token.kind)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|token| token.position)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.position + 1).unwrap_or(0))
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).copied();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn require_advanced(&self, symbol: char) -> Result<(), FormulaError> {
        if self.allow_advanced {
            Ok(())
        } else {
            Err(FormulaError::SymbolDisabled { symbol })
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.bump();
                let expr = self.unary()?;
                Ok(Expr::Negate {
                    expr: Box::new(expr),
                })
            }
            Some(TokenKind::Plus) => {
                self.bump();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.postfix()?;
        if self.peek() == Some(TokenKind::Caret) {
            self.require_advanced('^')?;
            self.bump();
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.primary()?;
        while self.peek() == Some(TokenKind::Bang) {
            self.require_advanced('!')?;
            self.bump();
            expr = Expr::Factorial {
                expr: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let position = self.position();
        match self.bump() {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => Ok(Expr::Number { value }),
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(FormulaError::UnbalancedParenthesis { position }),
                }
            }
            Some(Token {
                kind: TokenKind::RParen,
                position,
            }) => Err(FormulaError::UnbalancedParenthesis { position }),
            Some(token) => Err(FormulaError::UnexpectedToken {
                position: token.position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

pub fn parse_formula(input: &str, allow_advanced: bool) -> Result<Expr, FormulaError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut parser = Parser {
        tokens,
        cursor: 0,
        allow_advanced,
    };
    let expr = parser.expr()?;
    if let Some(token) = parser.bump() {
        return match token.kind {
            TokenKind::RParen => Err(FormulaError::UnbalancedParenthesis {
                position: token.position,
            }),
            _ => Err(FormulaError::UnexpectedToken {
                position: token.position,
            }),
        };
    }
    Ok(expr)
}

pub fn evaluate(input: &str, allow_advanced: bool) -> Result<f64, FormulaError> {
    parse_formula(input, allow_advanced)?.eval()
}
