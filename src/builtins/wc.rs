//! wc builtin command

use async_trait::async_trait;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The wc builtin - count lines, words and bytes.
///
/// Usage: wc [-l] [-w] [-c] [FILE...]
pub struct Wc;

#[async_trait]
impl Builtin for Wc {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut count_lines = false;
        let mut count_words = false;
        let mut count_bytes = false;
        let mut files: Vec<&str> = Vec::new();

        for arg in ctx.args {
            match arg.as_str() {
                "-l" => count_lines = true,
                "-w" => count_words = true,
                "-c" => count_bytes = true,
                s if s.starts_with('-') && s.len() > 1 => {
                    return Ok(ExecResult::err(
                        format!("wc: invalid option -- '{}'\n", &s[1..]),
                        1,
                    ));
                }
                _ => files.push(arg),
            }
        }
        if !count_lines && !count_words && !count_bytes {
            count_lines = true;
            count_words = true;
            count_bytes = true;
        }

        let mut output = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut totals = (0usize, 0usize, 0usize);

        let format_counts = |lines: usize, words: usize, bytes: usize, label: Option<&str>| {
            let mut parts = Vec::new();
            if count_lines {
                parts.push(format!("{:>7}", lines));
            }
            if count_words {
                parts.push(format!("{:>7}", words));
            }
            if count_bytes {
                parts.push(format!("{:>7}", bytes));
            }
            match label {
                Some(label) => format!("{} {}\n", parts.join(""), label),
                None => format!("{}\n", parts.join("")),
            }
        };

        if files.is_empty() {
            let content = ctx.stdin.unwrap_or("");
            let (lines, words, bytes) = counts(content);
            output.push_str(&format_counts(lines, words, bytes, None));
        } else {
            for file in &files {
                let path = resolve_path(ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(bytes_content) => {
                        let content = String::from_utf8_lossy(&bytes_content);
                        let (lines, words, bytes) = counts(&content);
                        totals.0 += lines;
                        totals.1 += words;
                        totals.2 += bytes;
                        output.push_str(&format_counts(lines, words, bytes, Some(file)));
                    }
                    Err(error) => {
                        stderr.push_str(&format!("wc: {}: {}\n", file, error));
                        exit_code = 1;
                    }
                }
            }
            if files.len() > 1 {
                output.push_str(&format_counts(totals.0, totals.1, totals.2, Some("total")));
            }
        }

        Ok(ExecResult {
            stdout: output,
            stderr,
            exit_code,
        })
    }
}

fn counts(content: &str) -> (usize, usize, usize) {
    (
        content.lines().count(),
        content.split_whitespace().count(),
        content.len(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};

    #[tokio::test]
    async fn wc_l_counts_lines() {
        let t = TestCtx::new();
        let a = args(&["-l"]);
        let result = Wc.execute(t.ctx_with_stdin(&a, "a\nb\nc\n")).await.unwrap();
        assert_eq!(result.stdout.trim(), "3");
    }

    #[tokio::test]
    async fn wc_w_counts_words() {
        let t = TestCtx::new();
        let a = args(&["-w"]);
        let result = Wc
            .execute(t.ctx_with_stdin(&a, "one two three\n"))
            .await
            .unwrap();
        assert_eq!(result.stdout.trim(), "3");
    }

    #[tokio::test]
    async fn wc_default_shows_all_counts() {
        let t = TestCtx::new();
        let a = args(&[]);
        let result = Wc.execute(t.ctx_with_stdin(&a, "hi\n")).await.unwrap();
        let fields: Vec<&str> = result.stdout.split_whitespace().collect();
        assert_eq!(fields, vec!["1", "1", "3"]);
    }

    #[tokio::test]
    async fn wc_missing_file_sets_exit_code() {
        let t = TestCtx::new();
        let a = args(&["/missing"]);
        let result = Wc.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("wc: /missing:"));
    }
}
