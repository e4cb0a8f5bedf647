//! Threshold expressions over named bands.
//!
//! A small predicate language for overlay layers:
//!
//! ```text
//! expr    := and ( ("||" | "or") and )*
//! and     := unary ( ("&&" | "and") unary )*
//! unary   := ("!" | "not") unary | primary
//! primary := "(" expr ")" | "true" | "false"
//!          | band cmp number        cmp: < <= > >= == !=
//!          | band "&" number        flag test, number may be hex (0x..)
//!          | band                   non-zero test
//! ```

use std::collections::HashMap;

use scene_common::{BoxedCause, RasterView};
use thiserror::Error;

use crate::overlay::{CompiledPredicate, PixelContext, PredicateEvaluator};

/// Errors raised while parsing an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown band '{0}'")]
    UnknownBand(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Maximum depth of the parsed expression tree.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn apply(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Cmp(CmpOp),
    Amp,
    AndAnd,
    OrOr,
    Not,
    Minus,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) | Token::Number(s) => f.write_str(s),
            Token::Cmp(op) => f.write_str(match op {
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
                CmpOp::Eq => "==",
                CmpOp::Ne => "!=",
            }),
            Token::Amp => f.write_str("&"),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::Minus => f.write_str("-"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::AndAnd);
                i += 2;
            }
            '&' => {
                tokens.push(Token::Amp);
                i += 1;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::OrOr);
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 2;
            }
            '<' | '>' => {
                let (op, len) = match (c, next) {
                    ('<', Some('=')) => (CmpOp::Le, 2),
                    ('<', _) => (CmpOp::Lt, 1),
                    ('>', Some('=')) => (CmpOp::Ge, 2),
                    _ => (CmpOp::Gt, 1),
                };
                tokens.push(Token::Cmp(op));
                i += len;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() {
                    let d = chars[i];
                    let exponent_sign =
                        (d == '+' || d == '-') && matches!(chars[i - 1], 'e' | 'E') && !is_hex(&chars[start..i]);
                    if d.is_ascii_alphanumeric() || d == '.' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_ascii_lowercase().as_str() {
                    "and" => Token::AndAnd,
                    "or" => Token::OrOr,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            ch => return Err(ExprError::UnexpectedChar { ch, pos: i }),
        }
    }
    Ok(tokens)
}

fn is_hex(chars: &[char]) -> bool {
    chars.len() > 1 && chars[0] == '0' && matches!(chars[1], 'x' | 'X')
}

fn parse_number(text: &str, negative: bool) -> Result<f64, ExprError> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).map(|v| v as f64).ok(),
        None => text.parse::<f64>().ok(),
    };
    let value = value.ok_or_else(|| ExprError::InvalidNumber(text.to_string()))?;
    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(bool),
    Compare { band: usize, op: CmpOp, value: f64 },
    Flag { band: usize, mask: i64 },
    NonZero { band: usize },
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    band_names: &'t HashMap<String, usize>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    /// One level deeper in the tree; both recursion and operator chains count.
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(ExprError::TooDeep(MAX_EXPRESSION_DEPTH));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        let entered = self.depth;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            self.descend()?;
            node = Node::Or(Box::new(node), Box::new(self.parse_and()?));
        }
        self.depth = entered;
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        let entered = self.depth;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            self.descend()?;
            node = Node::And(Box::new(node), Box::new(self.parse_unary()?));
        }
        self.depth = entered;
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ExprError> {
        match self.next()? {
            Token::LParen => {
                self.descend()?;
                let node = self.parse_or()?;
                self.depth -= 1;
                match self.next()? {
                    Token::RParen => Ok(node),
                    other => Err(ExprError::UnexpectedToken(other.to_string())),
                }
            }
            Token::Ident(name) if name.eq_ignore_ascii_case("true") => Ok(Node::Const(true)),
            Token::Ident(name) if name.eq_ignore_ascii_case("false") => Ok(Node::Const(false)),
            Token::Ident(name) => {
                let band = *self
                    .band_names
                    .get(&name)
                    .ok_or_else(|| ExprError::UnknownBand(name.clone()))?;
                match self.peek() {
                    Some(Token::Cmp(op)) => {
                        let op = *op;
                        self.pos += 1;
                        let value = self.parse_signed_number()?;
                        Ok(Node::Compare { band, op, value })
                    }
                    Some(Token::Amp) => {
                        self.pos += 1;
                        let mask = self.parse_signed_number()? as i64;
                        Ok(Node::Flag { band, mask })
                    }
                    _ => Ok(Node::NonZero { band }),
                }
            }
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    fn parse_signed_number(&mut self) -> Result<f64, ExprError> {
        let negative = self.peek() == Some(&Token::Minus);
        if negative {
            self.pos += 1;
        }
        match self.next()? {
            Token::Number(text) => parse_number(&text, negative),
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }
}

/// Evaluates threshold expressions against a set of named bands.
#[derive(Default)]
pub struct ThresholdEvaluator<'a> {
    bands: Vec<&'a dyn RasterView>,
    names: HashMap<String, usize>,
}

impl<'a> ThresholdEvaluator<'a> {
    pub fn new() -> Self {
        Self {
            bands: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Make `raster` addressable as `name`; a later band replaces an earlier one of the same name.
    pub fn with_band(mut self, name: impl Into<String>, raster: &'a dyn RasterView) -> Self {
        let name = name.into();
        match self.names.get(&name) {
            Some(&slot) => self.bands[slot] = raster,
            None => {
                self.names.insert(name, self.bands.len());
                self.bands.push(raster);
            }
        }
        self
    }

    /// Parse `expression` without binding it to pixel data.
    pub fn parse(&self, expression: &str) -> Result<(), ExprError> {
        self.build(expression).map(|_| ())
    }

    fn build(&self, expression: &str) -> Result<Node, ExprError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            band_names: &self.names,
        };
        let node = parser.parse_or()?;
        match parser.peek() {
            None => Ok(node),
            Some(extra) => Err(ExprError::UnexpectedToken(extra.to_string())),
        }
    }
}

struct ThresholdPredicate<'a> {
    bands: Vec<&'a dyn RasterView>,
    root: Node,
}

impl ThresholdPredicate<'_> {
    fn eval(&self, node: &Node, index: usize) -> bool {
        match node {
            Node::Const(b) => *b,
            Node::Compare { band, op, value } => op.apply(self.bands[*band].sample(index), *value),
            Node::Flag { band, mask } => {
                let sample = self.bands[*band].sample(index);
                !sample.is_nan() && (sample as i64) & mask != 0
            }
            Node::NonZero { band } => {
                let sample = self.bands[*band].sample(index);
                !sample.is_nan() && sample != 0.0
            }
            Node::Not(inner) => !self.eval(inner, index),
            Node::And(a, b) => self.eval(a, index) && self.eval(b, index),
            Node::Or(a, b) => self.eval(a, index) || self.eval(b, index),
        }
    }
}

impl CompiledPredicate for ThresholdPredicate<'_> {
    fn evaluate(&self, pixel: &PixelContext) -> bool {
        self.eval(&self.root, pixel.index)
    }
}

impl PredicateEvaluator for ThresholdEvaluator<'_> {
    fn compile(&self, expression: &str) -> Result<Box<dyn CompiledPredicate + '_>, BoxedCause> {
        let root = self.build(expression)?;
        Ok(Box::new(ThresholdPredicate {
            bands: self.bands.clone(),
            root,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_common::SampleBand;

    fn ctx(index: usize) -> PixelContext {
        PixelContext { x: index, y: 0, index }
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("flags & 0x04 || sst >= -1.5e-1").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("flags".into()),
                Token::Amp,
                Token::Number("0x04".into()),
                Token::OrOr,
                Token::Ident("sst".into()),
                Token::Cmp(CmpOp::Ge),
                Token::Minus,
                Token::Number("1.5e-1".into()),
            ]
        );
        assert_eq!(tokenize("a # b"), Err(ExprError::UnexpectedChar { ch: '#', pos: 2 }));
    }

    #[test]
    fn test_precedence_and_binds_tighter() {
        let band = SampleBand::new("v", 3, 1, vec![1.0, 2.0, 3.0]).unwrap();
        let evaluator = ThresholdEvaluator::new().with_band("v", &band);
        // v == 1 || (v > 1 && v < 3)
        let p = evaluator.compile("v == 1 || v > 1 && v < 3").unwrap();
        assert!(p.evaluate(&ctx(0)));
        assert!(p.evaluate(&ctx(1)));
        assert!(!p.evaluate(&ctx(2)));

        let p = evaluator.compile("not (v >= 2) or false").unwrap();
        assert!(p.evaluate(&ctx(0)));
        assert!(!p.evaluate(&ctx(1)));
    }

    #[test]
    fn test_flag_and_nonzero() {
        let flags = SampleBand::new("flags", 3, 1, vec![0.0, 4.0, 6.0]).unwrap();
        let evaluator = ThresholdEvaluator::new().with_band("flags", &flags);
        let p = evaluator.compile("flags & 0x02").unwrap();
        assert!(!p.evaluate(&ctx(0)));
        assert!(!p.evaluate(&ctx(1)));
        assert!(p.evaluate(&ctx(2)));

        let p = evaluator.compile("flags").unwrap();
        assert!(!p.evaluate(&ctx(0)));
        assert!(p.evaluate(&ctx(1)));
    }

    #[test]
    fn test_compile_errors() {
        let band = SampleBand::constant("v", 1, 1, 0.0);
        let evaluator = ThresholdEvaluator::new().with_band("v", &band);
        assert_eq!(evaluator.parse("w > 1"), Err(ExprError::UnknownBand("w".into())));
        assert_eq!(evaluator.parse("v &"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluator.parse("v > 1 )"), Err(ExprError::UnexpectedToken(")".into())));
        assert_eq!(evaluator.parse("v > 1.2.3"), Err(ExprError::InvalidNumber("1.2.3".into())));
        assert!(evaluator.compile("(v > 1").is_err());
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let band = SampleBand::constant("v", 1, 1, 1.0);
        let evaluator = ThresholdEvaluator::new().with_band("v", &band);
        let limit = Err(ExprError::TooDeep(MAX_EXPRESSION_DEPTH));

        assert_eq!(evaluator.parse(&("!".repeat(200_000) + "true")), limit);
        assert_eq!(evaluator.parse(&format!("{}v{}", "(".repeat(100_000), ")".repeat(100_000))), limit);
        let chain = vec!["v > 0"; 100_000].join(" && ");
        assert_eq!(evaluator.parse(&chain), limit);

        let p = evaluator
            .compile(&format!("{}v > 0{}", "(".repeat(100), ")".repeat(100)))
            .unwrap();
        assert!(p.evaluate(&ctx(0)));
        let chain = vec!["v > 0"; 50].join(" || ");
        assert!(evaluator.parse(&chain).is_ok());
    }
}
