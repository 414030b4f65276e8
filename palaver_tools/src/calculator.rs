use async_trait::async_trait;
use tracing::debug;

use super::{Tool, ToolDefinition, ToolResult};

const FAILURE: &str = "I don't know how to do that.";

/// Deepest nesting of parentheses, signs and exponents accepted.
const MAX_DEPTH: usize = 256;

/// Arithmetic evaluator for the agent.
///
/// Supports `+ - * / % ^`, parentheses, unary minus, the constants `pi`
/// and `e`, and a handful of single-argument functions.
pub struct CalculatorTool;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else if d == '_' || d == ',' {
                    // digit grouping
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(literal.parse().ok()?));
        } else if c.is_ascii_alphabetic() {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_alphanumeric() {
                    ident.push(d.to_ascii_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
        } else {
            chars.next();
            tokens.push(match c {
                '+' | '-' | '*' | '/' | '%' | '^' => Token::Op(c),
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => return None,
            });
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Some(value)
    }

    // Every recursive path passes through here, so this bounds the stack.
    fn unary(&mut self) -> Option<f64> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|v| -v),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        value
    }

    // Right associative, and binds tighter than unary minus: -2^2 == -4.
    fn power(&mut self) -> Option<f64> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn primary(&mut self) -> Option<f64> {
        match self.advance()? {
            Token::Number(n) => Some(n),
            Token::LParen => {
                let value = self.expression()?;
                (self.advance()? == Token::RParen).then_some(value)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let arg = self.expression()?;
                    if self.advance()? != Token::RParen {
                        return None;
                    }
                    apply_function(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Token::Op(_) | Token::RParen => None,
        }
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn apply_function(name: &str, arg: f64) -> Option<f64> {
    let value = match name {
        "sqrt" => arg.sqrt(),
        "abs" => arg.abs(),
        "ln" => arg.ln(),
        "log" => arg.log10(),
        "exp" => arg.exp(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        _ => return None,
    };
    Some(value)
}

/// Evaluate an expression, or `None` if it is malformed or the result is
/// not a finite number.
fn evaluate(input: &str) -> Option<f64> {
    let input = input.trim().trim_matches('"').trim_matches('`');
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    (parser.pos == parser.tokens.len() && value.is_finite()).then_some(value)
}

fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Useful for getting the result of a math expression. \
                The input to this tool should be a valid mathematical expression \
                that could be executed by a simple calculator."
                .to_string(),
        }
    }

    async fn execute(&self, input: &str) -> ToolResult {
        evaluate(input).map_or_else(
            || {
                debug!("Calculator rejected input: {input}");
                ToolResult::error(FAILURE).with_error_type("invalid_expression")
            },
            |value| ToolResult::success(format_number(value)),
        )
    }
}
