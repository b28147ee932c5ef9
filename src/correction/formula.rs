//! Evaluator for the arithmetic subset of TFormula that corrections are written in.
//!
//! Supports numbers (with exponents), the positional variables `x`, `y`, `z`, `t`,
//! `+ - * /`, unary minus, parentheses, and the functions `exp`, `atan`, `abs`,
//! `sqrt`, `log`, `pow`, `min`, `max`.

use crate::error::AppError;

const VARIABLES: [&str; 4] = ["x", "y", "z", "t"];

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Var(usize),
    Neg(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Exp,
    Atan,
    Abs,
    Sqrt,
    Log,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        Some(match name {
            "exp" => Func::Exp,
            "atan" => Func::Atan,
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

/// A parsed formula ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    root: Node,
    n_vars: usize,
}

impl Formula {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            n_vars: 0,
        };
        let root = parser.expr()?;
        if let Some(tok) = parser.peek() {
            return Err(invalid(format!("unexpected {tok:?} after expression")));
        }
        Ok(Formula {
            root,
            n_vars: parser.n_vars,
        })
    }

    /// Number of positional inputs the formula reads (`x` = 1, `y` = 2, ...).
    pub fn arity(&self) -> usize {
        self.n_vars
    }

    pub fn eval(&self, inputs: &[f64]) -> Result<f64, AppError> {
        if inputs.len() < self.n_vars {
            return Err(AppError::config(format!(
                "Formula reads {} inputs, {} given.",
                self.n_vars,
                inputs.len()
            )));
        }
        Ok(eval(&self.root, inputs))
    }
}

fn eval(node: &Node, vals: &[f64]) -> f64 {
    match node {
        Node::Number(v) => *v,
        Node::Var(i) => vals[*i],
        Node::Neg(a) => -eval(a, vals),
        Node::Binary(op, a, b) => {
            let (l, r) = (eval(a, vals), eval(b, vals));
            match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => l / r,
            }
        }
        Node::Call(f, args) => {
            let a = eval(&args[0], vals);
            match f {
                Func::Exp => a.exp(),
                Func::Atan => a.atan(),
                Func::Abs => a.abs(),
                Func::Sqrt => a.sqrt(),
                Func::Log => a.ln(),
                Func::Pow => a.powf(eval(&args[1], vals)),
                Func::Min => a.min(eval(&args[1], vals)),
                Func::Max => a.max(eval(&args[1], vals)),
            }
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> AppError {
    AppError::config(format!("Invalid formula: {msg}."))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, AppError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            _ if c.is_ascii_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < bytes.len() {
                    let d = bytes[i] as char;
                    let exponent_sign = (d == '+' || d == '-')
                        && matches!(bytes[i - 1] as char, 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &input[start..i];
                let v = text
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("bad number '{text}'")))?;
                tokens.push(Token::Num(v));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            _ => return Err(invalid(format!("unexpected character '{c}'"))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    n_vars: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), AppError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            other => Err(invalid(format!("expected {want:?}, found {other:?}"))),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Node, AppError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek() {
            let op = if *c == '+' { Op::Add } else { Op::Sub };
            self.pos += 1;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(self.term()?));
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Node, AppError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(c @ ('*' | '/'))) = self.peek() {
            let op = if *c == '*' { Op::Mul } else { Op::Div };
            self.pos += 1;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, AppError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node, AppError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Node::Number(v)),
            Some(Token::Open) => {
                let inner = self.expr()?;
                self.expect(Token::Close)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if let Some(func) = Func::lookup(&name) {
                    return self.call(func);
                }
                let idx = VARIABLES
                    .iter()
                    .position(|v| *v == name)
                    .ok_or_else(|| invalid(format!("unknown identifier '{name}'")))?;
                self.n_vars = self.n_vars.max(idx + 1);
                Ok(Node::Var(idx))
            }
            other => Err(invalid(format!("unexpected {other:?}"))),
        }
    }

    fn call(&mut self, func: Func) -> Result<Node, AppError> {
        self.expect(Token::Open)?;
        let mut args = vec![self.expr()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::Close)?;
        if args.len() != func.arity() {
            return Err(invalid(format!(
                "{func:?} takes {} argument(s), got {}",
                func.arity(),
                args.len()
            )));
        }
        Ok(Node::Call(func, args))
    }
}
