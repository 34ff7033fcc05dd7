//! test builtin command (`test` and `[`)

use async_trait::async_trait;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The test builtin - evaluate a conditional expression.
///
/// Usage: test EXPRESSION / [ EXPRESSION ]
///
/// Supports `!` negation, string operators (`=`, `!=`, `-z`, `-n`, bare
/// string), numeric comparisons (`-eq -ne -lt -le -gt -ge`), and file tests
/// (`-e -f -d`).
pub struct Test;

#[async_trait]
impl Builtin for Test {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut args: Vec<&str> = ctx.args.iter().map(|s| s.as_str()).collect();

        // Invoked as `[`: require and strip the closing bracket
        // (the dispatch gives us no way to see our own name, but a trailing
        // `]` is only ever present for the bracket form)
        if args.last() == Some(&"]") {
            args.pop();
        }

        match evaluate(&args, &ctx).await {
            Ok(true) => Ok(ExecResult::ok(String::new())),
            Ok(false) => Ok(ExecResult::with_code(String::new(), 1)),
            Err(message) => Ok(ExecResult::err(format!("test: {}\n", message), 2)),
        }
    }
}

async fn evaluate(args: &[&str], ctx: &Context<'_>) -> std::result::Result<bool, String> {
    match args {
        [] => Ok(false),
        ["!", rest @ ..] => Ok(!Box::pin(evaluate(rest, ctx)).await?),
        [value] => Ok(!value.is_empty()),
        ["-z", value] => Ok(value.is_empty()),
        ["-n", value] => Ok(!value.is_empty()),
        ["-e", path] => Ok(stat_kind(ctx, path).await.is_some()),
        ["-f", path] => Ok(stat_kind(ctx, path).await == Some(FileKind::File)),
        ["-d", path] => Ok(stat_kind(ctx, path).await == Some(FileKind::Directory)),
        [left, "=", right] | [left, "==", right] => Ok(left == right),
        [left, "!=", right] => Ok(left != right),
        [left, op @ ("-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge"), right] => {
            let a: i64 = left
                .parse()
                .map_err(|_| format!("{}: integer expression expected", left))?;
            let b: i64 = right
                .parse()
                .map_err(|_| format!("{}: integer expression expected", right))?;
            Ok(match *op {
                "-eq" => a == b,
                "-ne" => a != b,
                "-lt" => a < b,
                "-le" => a <= b,
                "-gt" => a > b,
                _ => a >= b,
            })
        }
        _ => Err("too many arguments".to_string()),
    }
}

#[derive(PartialEq)]
enum FileKind {
    File,
    Directory,
}

async fn stat_kind(ctx: &Context<'_>, path: &str) -> Option<FileKind> {
    let resolved = resolve_path(ctx.cwd, path);
    match ctx.fs.stat(&resolved).await {
        Ok(meta) if meta.file_type.is_dir() => Some(FileKind::Directory),
        Ok(_) => Some(FileKind::File),
        Err(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};
    use std::path::Path;

    async fn check(t: &TestCtx, list: &[&str]) -> i32 {
        let a = args(list);
        Test.execute(t.ctx(&a)).await.unwrap().exit_code
    }

    #[tokio::test]
    async fn string_tests() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &["hello"]).await, 0);
        assert_eq!(check(&t, &[""]).await, 1);
        assert_eq!(check(&t, &["-z", ""]).await, 0);
        assert_eq!(check(&t, &["-n", "x"]).await, 0);
        assert_eq!(check(&t, &["a", "=", "a"]).await, 0);
        assert_eq!(check(&t, &["a", "=", "b"]).await, 1);
        assert_eq!(check(&t, &["a", "!=", "b"]).await, 0);
    }

    #[tokio::test]
    async fn numeric_tests() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &["2", "-eq", "2"]).await, 0);
        assert_eq!(check(&t, &["2", "-lt", "10"]).await, 0);
        assert_eq!(check(&t, &["10", "-le", "2"]).await, 1);
        assert_eq!(check(&t, &["3", "-gt", "2"]).await, 0);
    }

    #[tokio::test]
    async fn numeric_on_non_number_is_usage_error() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &["x", "-eq", "2"]).await, 2);
    }

    #[tokio::test]
    async fn negation() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &["!", "a", "=", "b"]).await, 0);
        assert_eq!(check(&t, &["!", "-z", ""]).await, 1);
    }

    #[tokio::test]
    async fn file_tests() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/file"), b"x");
        assert_eq!(check(&t, &["-e", "/tmp/file"]).await, 0);
        assert_eq!(check(&t, &["-f", "/tmp/file"]).await, 0);
        assert_eq!(check(&t, &["-d", "/tmp/file"]).await, 1);
        assert_eq!(check(&t, &["-d", "/tmp"]).await, 0);
        assert_eq!(check(&t, &["-e", "/nope"]).await, 1);
    }

    #[tokio::test]
    async fn bracket_form_strips_closing_bracket() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &["a", "=", "a", "]"]).await, 0);
    }

    #[tokio::test]
    async fn empty_expression_is_false() {
        let t = TestCtx::new();
        assert_eq!(check(&t, &[]).await, 1);
    }
}
