//! head and tail builtins

use async_trait::async_trait;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The head builtin - output the first lines of input.
///
/// Usage: head [-n COUNT] [FILE...]
pub struct Head;

/// The tail builtin - output the last lines of input.
///
/// Usage: tail [-n COUNT] [FILE...]
pub struct Tail;

#[async_trait]
impl Builtin for Head {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        run(ctx, "head", |content, count| {
            let mut out = String::new();
            for line in content.lines().take(count) {
                out.push_str(line);
                out.push('\n');
            }
            out
        })
        .await
    }
}

#[async_trait]
impl Builtin for Tail {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        run(ctx, "tail", |content, count| {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(count);
            let mut out = String::new();
            for line in &lines[start..] {
                out.push_str(line);
                out.push('\n');
            }
            out
        })
        .await
    }
}

async fn run(
    ctx: Context<'_>,
    name: &str,
    select: impl Fn(&str, usize) -> String,
) -> Result<ExecResult> {
    let mut count = 10usize;
    let mut files: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < ctx.args.len() {
        match ctx.args[i].as_str() {
            "-n" => {
                i += 1;
                let value = match ctx.args.get(i) {
                    Some(v) => v,
                    None => {
                        return Ok(ExecResult::err(
                            format!("{}: option requires an argument -- 'n'\n", name),
                            1,
                        ))
                    }
                };
                count = match value.parse() {
                    Ok(n) => n,
                    Err(_) => {
                        return Ok(ExecResult::err(
                            format!("{}: invalid number of lines: '{}'\n", name, value),
                            1,
                        ))
                    }
                };
            }
            s if s.starts_with('-') && s.len() > 1 => {
                // -N shorthand
                match s[1..].parse() {
                    Ok(n) => count = n,
                    Err(_) => {
                        return Ok(ExecResult::err(
                            format!("{}: invalid option -- '{}'\n", name, &s[1..]),
                            1,
                        ))
                    }
                }
            }
            file => files.push(file),
        }
        i += 1;
    }

    let mut output = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    if files.is_empty() {
        output.push_str(&select(ctx.stdin.unwrap_or(""), count));
    } else {
        for file in files {
            let path = resolve_path(ctx.cwd, file);
            match ctx.fs.read_file(&path).await {
                Ok(bytes) => {
                    output.push_str(&select(&String::from_utf8_lossy(&bytes), count))
                }
                Err(error) => {
                    stderr.push_str(&format!("{}: {}: {}\n", name, file, error));
                    exit_code = 1;
                }
            }
        }
    }

    Ok(ExecResult {
        stdout: output,
        stderr,
        exit_code,
    })
}
