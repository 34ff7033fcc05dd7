//! Error types for vbash

use thiserror::Error;

/// Result type alias using vbash's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// vbash error types.
///
/// Per-command failures (bad flags, missing files, non-zero exits) are not
/// errors; they are reported through `ExecResult`. Only lexer/parser/expansion
/// failures and exceeded execution budgets travel as `Error`, and the shell
/// facade converts them to diagnostics before they reach callers.
#[derive(Error, Debug)]
pub enum Error {
    /// Syntax error from the lexer or parser. The message is the full
    /// diagnostic shown to the user.
    #[error("{0}")]
    Parse(String),

    /// Runtime error raised during expansion or evaluation.
    #[error("{0}")]
    Exec(String),

    /// Execution budget exceeded.
    #[error(transparent)]
    Limit(#[from] crate::limits::LimitExceeded),

    /// I/O error from filesystem operations.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
