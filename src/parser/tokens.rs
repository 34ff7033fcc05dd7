//! Token types produced by the lexer

use super::ast::{RedirectKind, Word};

/// A lexical token.
///
/// Words carry their pre-scanned parts (quoting contexts, expansions) so the
/// parser never re-examines raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A word, with quoting and expansion structure resolved
    Word(Word),
    /// End of line
    Newline,
    /// `;`
    Semicolon,
    /// `;;` (case clause terminator)
    DSemi,
    /// `&` - accepted, treated as `;`
    Background,
    /// `|`
    Pipe,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{` at command position
    LeftBrace,
    /// `}` terminating a brace group
    RightBrace,
    /// A redirection operator, optionally fd-prefixed (`2>`)
    Redirect { fd: Option<i32>, kind: RedirectKind },
    /// Fd duplication (`2>&1`)
    RedirectDup { fd: i32, target: i32 },
}

/// Render a token for "unexpected token" diagnostics.
pub fn token_text(token: &Token) -> String {
    match token {
        Token::Word(w) => w.to_string(),
        Token::Newline => "newline".to_string(),
        Token::Semicolon => ";".to_string(),
        Token::DSemi => ";;".to_string(),
        Token::Background => "&".to_string(),
        Token::Pipe => "|".to_string(),
        Token::And => "&&".to_string(),
        Token::Or => "||".to_string(),
        Token::LeftParen => "(".to_string(),
        Token::RightParen => ")".to_string(),
        Token::LeftBrace => "{".to_string(),
        Token::RightBrace => "}".to_string(),
        Token::Redirect { fd, kind } => {
            let op = match kind {
                RedirectKind::Output => ">",
                RedirectKind::Append => ">>",
                RedirectKind::Input => "<",
                RedirectKind::HereDoc => "<<",
                RedirectKind::HereString => "<<<",
                RedirectKind::DupOutput => ">&",
                RedirectKind::OutputBoth => "&>",
            };
            match fd {
                Some(n) => format!("{}{}", n, op),
                None => op.to_string(),
            }
        }
        Token::RedirectDup { fd, target } => format!("{}>&{}", fd, target),
    }
}
