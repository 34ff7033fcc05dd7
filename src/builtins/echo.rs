//! echo builtin command

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The echo builtin command.
///
/// Usage: echo [-n] [-e] [-E] [ARG...]
pub struct Echo;

#[async_trait]
impl Builtin for Echo {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut output = String::new();
        let mut add_newline = true;
        let mut interpret_escapes = false;
        let mut args_iter = ctx.args.iter().peekable();

        while let Some(arg) = args_iter.peek() {
            match arg.as_str() {
                "-n" => {
                    add_newline = false;
                    args_iter.next();
                }
                "-e" => {
                    interpret_escapes = true;
                    args_iter.next();
                }
                "-E" => {
                    interpret_escapes = false;
                    args_iter.next();
                }
                _ => break,
            }
        }

        for (i, arg) in args_iter.enumerate() {
            if i > 0 {
                output.push(' ');
            }
            if interpret_escapes {
                output.push_str(&interpret_escape_sequences(arg));
            } else {
                output.push_str(arg);
            }
        }

        if add_newline {
            output.push('\n');
        }

        Ok(ExecResult::ok(output))
    }
}

fn interpret_escape_sequences(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('a') => result.push('\x07'),
            Some('b') => result.push('\x08'),
            Some('f') => result.push('\x0c'),
            Some('v') => result.push('\x0b'),
            Some('0') => result.push('\0'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};

    #[tokio::test]
    async fn echo_joins_args_with_spaces() {
        let t = TestCtx::new();
        let a = args(&["hello", "world"]);
        let result = Echo.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn echo_n_suppresses_newline() {
        let t = TestCtx::new();
        let a = args(&["-n", "x"]);
        let result = Echo.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "x");
    }

    #[tokio::test]
    async fn echo_e_interprets_escapes() {
        let t = TestCtx::new();
        let a = args(&["-e", "a\\tb\\n"]);
        let result = Echo.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "a\tb\n\n");
    }

    #[tokio::test]
    async fn echo_no_args_prints_newline() {
        let t = TestCtx::new();
        let a = args(&[]);
        let result = Echo.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "\n");
    }
}
