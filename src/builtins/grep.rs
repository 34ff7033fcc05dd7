//! grep builtin command

use async_trait::async_trait;
use regex::RegexBuilder;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The grep builtin - search input for lines matching a pattern.
///
/// Usage: grep [-i] [-v] [-n] [-c] [-q] PATTERN [FILE...]
///
/// Options:
///   -i   Case-insensitive matching
///   -v   Select non-matching lines
///   -n   Prefix output with line numbers
///   -c   Print only a count of matching lines
///   -q   Quiet; exit status only
///
/// Exit status: 0 if any line matched, 1 if none did, 2 on errors.
pub struct Grep;

#[async_trait]
impl Builtin for Grep {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut ignore_case = false;
        let mut invert = false;
        let mut line_numbers = false;
        let mut count_only = false;
        let mut quiet = false;
        let mut pattern: Option<&str> = None;
        let mut files: Vec<&str> = Vec::new();

        for arg in ctx.args {
            match arg.as_str() {
                "-i" => ignore_case = true,
                "-v" => invert = true,
                "-n" => line_numbers = true,
                "-c" => count_only = true,
                "-q" => quiet = true,
                s if s.starts_with('-') && s.len() > 1 => {
                    return Ok(ExecResult::err(
                        format!("grep: invalid option -- '{}'\n", &s[1..]),
                        2,
                    ));
                }
                s => {
                    if pattern.is_none() {
                        pattern = Some(s);
                    } else {
                        files.push(s);
                    }
                }
            }
        }

        let pattern = match pattern {
            Some(p) => p,
            None => {
                return Ok(ExecResult::err(
                    "grep: missing pattern\n".to_string(),
                    2,
                ))
            }
        };
        let regex = match RegexBuilder::new(pattern).case_insensitive(ignore_case).build() {
            Ok(regex) => regex,
            Err(_) => {
                return Ok(ExecResult::err(
                    format!("grep: invalid pattern '{}'\n", pattern),
                    2,
                ))
            }
        };

        let mut output = String::new();
        let mut stderr = String::new();
        let mut any_match = false;
        let mut had_error = false;
        let prefix_names = files.len() > 1;

        let mut scan = |content: &str, label: Option<&str>| {
            let mut count = 0usize;
            for (i, line) in content.lines().enumerate() {
                let matched = regex.is_match(line) != invert;
                if !matched {
                    continue;
                }
                any_match = true;
                count += 1;
                if quiet || count_only {
                    continue;
                }
                if let Some(name) = label {
                    output.push_str(name);
                    output.push(':');
                }
                if line_numbers {
                    output.push_str(&format!("{}:", i + 1));
                }
                output.push_str(line);
                output.push('\n');
            }
            if count_only && !quiet {
                match label {
                    Some(name) => output.push_str(&format!("{}:{}\n", name, count)),
                    None => output.push_str(&format!("{}\n", count)),
                }
            }
        };

        if files.is_empty() {
            scan(ctx.stdin.unwrap_or(""), None);
        } else {
            for file in &files {
                let path = resolve_path(ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(bytes) => {
                        let content = String::from_utf8_lossy(&bytes).to_string();
                        scan(&content, if prefix_names { Some(file) } else { None });
                    }
                    Err(error) => {
                        stderr.push_str(&format!("grep: {}: {}\n", file, error));
                        had_error = true;
                    }
                }
            }
        }

        let exit_code = if had_error {
            2
        } else if any_match {
            0
        } else {
            1
        };
        Ok(ExecResult {
            stdout: if quiet { String::new() } else { output },
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};
    use std::path::Path;

    #[tokio::test]
    async fn grep_matches_lines() {
        let t = TestCtx::new();
        let a = args(&["b"]);
        let result = Grep
            .execute(t.ctx_with_stdin(&a, "apple\nbanana\ncherry\n"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "banana\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn grep_no_match_exits_one() {
        let t = TestCtx::new();
        let a = args(&["zzz"]);
        let result = Grep.execute(t.ctx_with_stdin(&a, "abc\n")).await.unwrap();
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn grep_case_insensitive() {
        let t = TestCtx::new();
        let a = args(&["-i", "HELLO"]);
        let result = Grep.execute(t.ctx_with_stdin(&a, "hello\n")).await.unwrap();
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn grep_invert_match() {
        let t = TestCtx::new();
        let a = args(&["-v", "a"]);
        let result = Grep
            .execute(t.ctx_with_stdin(&a, "apple\nberry\n"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "berry\n");
    }

    #[tokio::test]
    async fn grep_line_numbers_and_count() {
        let t = TestCtx::new();
        let a = args(&["-n", "x"]);
        let result = Grep
            .execute(t.ctx_with_stdin(&a, "x\ny\nx\n"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "1:x\n3:x\n");

        let a = args(&["-c", "x"]);
        let result = Grep
            .execute(t.ctx_with_stdin(&a, "x\ny\nx\n"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "2\n");
    }

    #[tokio::test]
    async fn grep_multiple_files_prefixes_names() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/a"), b"hit\nmiss\n");
        t.fs.seed_file(Path::new("/tmp/b"), b"hit\n");
        let a = args(&["hit", "/tmp/a", "/tmp/b"]);
        let result = Grep.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "/tmp/a:hit\n/tmp/b:hit\n");
    }

    #[tokio::test]
    async fn grep_missing_file_exit_two() {
        let t = TestCtx::new();
        let a = args(&["x", "/missing"]);
        let result = Grep.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.contains("grep: /missing:"));
    }
}
