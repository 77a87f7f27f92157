//! Plain-math expression parser and evaluator.
//!
//! A small Pratt parser over a hand-rolled lexer. Accepts the grammar the
//! preprocessor emits: numbers, symbols, `+ - * / ^`, parens, a few named
//! functions, unary minus, and implicit multiplication (`2x`, `3(x+1)`).
//! An equation `lhs = rhs` parses as the difference `lhs - (rhs)`, so
//! equality checks reduce to comparing against zero.
//!
//! Parsing is total: any input it cannot understand yields `None`, which
//! the scorer reports as an explicit parse failure.

use std::collections::BTreeSet;

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Box<Expr>),
}

/// Recognized single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Log,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Func::Sqrt,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "log" => Func::Log,
            "abs" => Func::Abs,
            _ => return None,
        })
    }
}

impl Expr {
    /// All symbol names in the tree, sorted.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_symbols(out),
        }
    }

    /// Evaluate with symbol values. `None` on any domain error (division
    /// by ~zero, even root of a negative, log of a non-positive) or a
    /// non-finite result.
    pub fn eval(&self, vars: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Symbol(name) => vars(name)?,
            Expr::Add(a, b) => a.eval(vars)? + b.eval(vars)?,
            Expr::Sub(a, b) => a.eval(vars)? - b.eval(vars)?,
            Expr::Mul(a, b) => a.eval(vars)? * b.eval(vars)?,
            Expr::Div(a, b) => {
                let denom = b.eval(vars)?;
                if denom.abs() < 1e-12 {
                    return None;
                }
                a.eval(vars)? / denom
            }
            Expr::Pow(a, b) => {
                let base = a.eval(vars)?;
                let exp = b.eval(vars)?;
                if base < 0.0 && exp.fract() != 0.0 {
                    return None;
                }
                base.powf(exp)
            }
            Expr::Neg(a) => -a.eval(vars)?,
            Expr::Call(func, a) => {
                let arg = a.eval(vars)?;
                match func {
                    Func::Sqrt => {
                        if arg < 0.0 {
                            return None;
                        }
                        arg.sqrt()
                    }
                    Func::Sin => arg.sin(),
                    Func::Cos => arg.cos(),
                    Func::Tan => arg.tan(),
                    Func::Exp => arg.exp(),
                    Func::Ln => {
                        if arg <= 0.0 {
                            return None;
                        }
                        arg.ln()
                    }
                    Func::Log => {
                        if arg <= 0.0 {
                            return None;
                        }
                        arg.log10()
                    }
                    Func::Abs => arg.abs(),
                }
            }
        };
        value.is_finite().then_some(value)
    }

    /// Evaluate an expression with no free symbols.
    pub fn eval_constant(&self) -> Option<f64> {
        self.eval(&|_| None)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                // Tolerate Python-style `**` for exponentiation.
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(text.parse().ok()?));
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = match self.next()? {
            Token::Number(n) => Expr::Number(n),
            Token::Ident(name) => self.ident(name)?,
            Token::Minus => Expr::Neg(Box::new(self.parse_bp(5)?)),
            Token::Plus => self.parse_bp(5)?,
            Token::LParen => {
                let inner = self.parse_bp(0)?;
                match self.next()? {
                    Token::RParen => inner,
                    _ => return None,
                }
            }
            _ => return None,
        };

        loop {
            let (l_bp, r_bp, op) = match self.peek() {
                Some(Token::Plus) => (1, 2, Op::Add),
                Some(Token::Minus) => (1, 2, Op::Sub),
                Some(Token::Star) => (3, 4, Op::Mul),
                Some(Token::Slash) => (3, 4, Op::Div),
                Some(Token::Caret) => (9, 8, Op::Pow),
                // Adjacency is multiplication: `2x`, `3(x+1)`, `x y`.
                Some(Token::Number(_) | Token::Ident(_) | Token::LParen) => (3, 4, Op::Juxtapose),
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }
            if op != Op::Juxtapose {
                self.next();
            }
            let rhs = self.parse_bp(r_bp)?;
            lhs = match op {
                Op::Add => Expr::Add(Box::new(lhs), Box::new(rhs)),
                Op::Sub => Expr::Sub(Box::new(lhs), Box::new(rhs)),
                Op::Mul | Op::Juxtapose => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                Op::Div => Expr::Div(Box::new(lhs), Box::new(rhs)),
                Op::Pow => Expr::Pow(Box::new(lhs), Box::new(rhs)),
            };
        }
        Some(lhs)
    }

    fn ident(&mut self, name: String) -> Option<Expr> {
        if let Some(func) = Func::from_name(&name) {
            if self.peek() == Some(&Token::LParen) {
                self.next();
                let arg = self.parse_bp(0)?;
                return match self.next()? {
                    Token::RParen => Some(Expr::Call(func, Box::new(arg))),
                    _ => None,
                };
            }
        }
        Some(match name.as_str() {
            "pi" => Expr::Number(std::f64::consts::PI),
            "e" => Expr::Number(std::f64::consts::E),
            _ => Expr::Symbol(name),
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Juxtapose,
}

/// Parse plain math. An equation with a single `=` parses as
/// `lhs - (rhs)`.
pub fn parse(input: &str) -> Option<Expr> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Some((lhs, rhs)) = input.split_once('=') {
        if !lhs.is_empty() && !rhs.is_empty() && !rhs.contains('=') {
            return Some(Expr::Sub(
                Box::new(parse_side(lhs)?),
                Box::new(parse_side(rhs)?),
            ));
        }
        return None;
    }
    parse_side(input)
}

fn parse_side(input: &str) -> Option<Expr> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let expr = parser.parse_bp(0)?;
    // Trailing tokens mean we did not understand the whole input.
    (parser.pos == parser.tokens.len()).then_some(expr)
}
