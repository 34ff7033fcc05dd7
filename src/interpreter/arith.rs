//! Arithmetic expansion evaluator
//!
//! Evaluates the expression inside `$((...))` over signed 64-bit integers:
//! `+ - * / %`, unary `-`/`+`/`!`, parentheses, and comparison operators
//! returning 1/0. Variable references (bare names or `$name`) resolve through
//! the supplied lookup; unset or non-numeric values count as 0, matching
//! shell behavior.

use crate::error::{Error, Result};

/// Evaluate an arithmetic expression.
pub(crate) fn eval_arith(expr: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<i64> {
    let tokens = tokenize(expr)?;
    let mut parser = ArithParser {
        tokens,
        pos: 0,
        lookup,
    };
    let value = parser.parse_cmp()?;
    if parser.pos != parser.tokens.len() {
        return Err(syntax_error(expr));
    }
    Ok(value)
}

fn syntax_error(expr: &str) -> Error {
    Error::Exec(format!("syntax error in expression: {}", expr.trim()))
}

#[derive(Debug, Clone, PartialEq)]
enum ArithToken {
    Number(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LeftParen,
    RightParen,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    Not,
}

fn tokenize(expr: &str) -> Result<Vec<ArithToken>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits.parse().map_err(|_| syntax_error(expr))?;
                tokens.push(ArithToken::Number(value));
            }
            // $name and bare name are equivalent here
            '$' => {
                chars.next();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(ArithToken::Ident(name));
            }
            '+' => {
                chars.next();
                tokens.push(ArithToken::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(ArithToken::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(ArithToken::Star);
            }
            '/' => {
                chars.next();
                tokens.push(ArithToken::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(ArithToken::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(ArithToken::LeftParen);
            }
            ')' => {
                chars.next();
                tokens.push(ArithToken::RightParen);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(ArithToken::Le);
                } else {
                    tokens.push(ArithToken::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(ArithToken::Ge);
                } else {
                    tokens.push(ArithToken::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(ArithToken::EqEq);
                } else {
                    return Err(syntax_error(expr));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(ArithToken::NotEq);
                } else {
                    tokens.push(ArithToken::Not);
                }
            }
            _ => return Err(syntax_error(expr)),
        }
    }

    Ok(tokens)
}

struct ArithParser<'a> {
    tokens: Vec<ArithToken>,
    pos: usize,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl ArithParser<'_> {
    fn peek(&self) -> Option<&ArithToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<ArithToken> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_cmp(&mut self) -> Result<i64> {
        let mut left = self.parse_add()?;
        while let Some(op) = self.peek().cloned() {
            let cmp: fn(i64, i64) -> bool = match op {
                ArithToken::Lt => |a, b| a < b,
                ArithToken::Le => |a, b| a <= b,
                ArithToken::Gt => |a, b| a > b,
                ArithToken::Ge => |a, b| a >= b,
                ArithToken::EqEq => |a, b| a == b,
                ArithToken::NotEq => |a, b| a != b,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_add()?;
            left = cmp(left, right) as i64;
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<i64> {
        let mut left = self.parse_mul()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                ArithToken::Plus => {
                    self.pos += 1;
                    left = left.wrapping_add(self.parse_mul()?);
                }
                ArithToken::Minus => {
                    self.pos += 1;
                    left = left.wrapping_sub(self.parse_mul()?);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<i64> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                ArithToken::Star => {
                    self.pos += 1;
                    left = left.wrapping_mul(self.parse_unary()?);
                }
                ArithToken::Slash => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    if right == 0 {
                        return Err(Error::Exec("division by 0".to_string()));
                    }
                    left = left.wrapping_div(right);
                }
                ArithToken::Percent => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    if right == 0 {
                        return Err(Error::Exec("division by 0".to_string()));
                    }
                    left = left.wrapping_rem(right);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<i64> {
        match self.peek() {
            Some(ArithToken::Minus) => {
                self.pos += 1;
                Ok(self.parse_unary()?.wrapping_neg())
            }
            Some(ArithToken::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(ArithToken::Not) => {
                self.pos += 1;
                Ok((self.parse_unary()? == 0) as i64)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<i64> {
        match self.bump() {
            Some(ArithToken::Number(n)) => Ok(n),
            Some(ArithToken::Ident(name)) => {
                // Unset or non-numeric variables evaluate to 0
                Ok((self.lookup)(&name)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0))
            }
            Some(ArithToken::LeftParen) => {
                let value = self.parse_cmp()?;
                match self.bump() {
                    Some(ArithToken::RightParen) => Ok(value),
                    _ => Err(Error::Exec("syntax error in expression".to_string())),
                }
            }
            _ => Err(Error::Exec("syntax error in expression".to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn eval(expr: &str) -> Result<i64> {
        eval_arith(expr, &|_| None)
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(eval("1 + 2").unwrap(), 3);
        assert_eq!(eval("10 - 4").unwrap(), 6);
        assert_eq!(eval("6 * 7").unwrap(), 42);
        assert_eq!(eval("7 / 2").unwrap(), 3);
        assert_eq!(eval("7 % 3").unwrap(), 1);
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9);
        assert_eq!(eval("2 * (3 + 4) - 5").unwrap(), 9);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval("-5").unwrap(), -5);
        assert_eq!(eval("- -5").unwrap(), 5);
        assert_eq!(eval("+3").unwrap(), 3);
        assert_eq!(eval("!0").unwrap(), 1);
        assert_eq!(eval("!7").unwrap(), 0);
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("1 < 2").unwrap(), 1);
        assert_eq!(eval("2 <= 1").unwrap(), 0);
        assert_eq!(eval("3 == 3").unwrap(), 1);
        assert_eq!(eval("3 != 3").unwrap(), 0);
        assert_eq!(eval("5 >= 5").unwrap(), 1);
    }

    #[test]
    fn variables_resolve_through_lookup() {
        let lookup = |name: &str| match name {
            "x" => Some("10".to_string()),
            "junk" => Some("abc".to_string()),
            _ => None,
        };
        assert_eq!(eval_arith("x * 2", &lookup).unwrap(), 20);
        assert_eq!(eval_arith("$x + 1", &lookup).unwrap(), 11);
        assert_eq!(eval_arith("junk + 1", &lookup).unwrap(), 1);
        assert_eq!(eval_arith("missing", &lookup).unwrap(), 0);
    }

    #[test]
    fn division_by_zero_errors() {
        let err = eval("1 / 0").unwrap_err();
        assert!(err.to_string().contains("division by 0"));
        assert!(eval("1 % 0").is_err());
    }

    #[test]
    fn syntax_errors() {
        assert!(eval("1 +").is_err());
        assert!(eval("(1 + 2").is_err());
        assert!(eval("1 ~ 2").is_err());
        assert!(eval("1 = 2").is_err());
    }

    proptest! {
        /// Differential check against Rust integer arithmetic.
        #[test]
        fn prop_add_matches_rust(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            prop_assert_eq!(eval(&format!("{} + {}", a, b)).unwrap(), a + b);
            prop_assert_eq!(eval(&format!("{} * {}", a, b)).unwrap(), a * b);
        }

        #[test]
        fn prop_div_matches_rust(a in -10_000i64..10_000, b in 1i64..1_000) {
            prop_assert_eq!(eval(&format!("{} / {}", a, b)).unwrap(), a / b);
            prop_assert_eq!(eval(&format!("{} % {}", a, b)).unwrap(), a % b);
        }

        #[test]
        fn prop_comparison_is_boolean(a in -100i64..100, b in -100i64..100) {
            let v = eval(&format!("{} < {}", a, b)).unwrap();
            prop_assert!(v == 0 || v == 1);
            prop_assert_eq!(v == 1, a < b);
        }
    }
}
