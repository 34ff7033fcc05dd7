//! cat builtin command

use async_trait::async_trait;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The cat builtin - concatenate files to stdout.
///
/// Usage: cat [-n] [FILE...]
///
/// With no files (or `-`), reads stdin. With `-n`, numbers output lines.
pub struct Cat;

#[async_trait]
impl Builtin for Cat {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut number_lines = false;
        let mut files: Vec<&str> = Vec::new();

        for arg in ctx.args {
            match arg.as_str() {
                "-n" => number_lines = true,
                _ => files.push(arg),
            }
        }

        let mut output = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        if files.is_empty() {
            output.push_str(ctx.stdin.unwrap_or(""));
        } else {
            for file in files {
                if file == "-" {
                    output.push_str(ctx.stdin.unwrap_or(""));
                    continue;
                }
                let path = resolve_path(ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(bytes) => output.push_str(&String::from_utf8_lossy(&bytes)),
                    Err(error) => {
                        stderr.push_str(&format!("cat: {}: {}\n", file, error));
                        exit_code = 1;
                    }
                }
            }
        }

        if number_lines {
            let mut numbered = String::new();
            for (i, line) in output.lines().enumerate() {
                numbered.push_str(&format!("{:>6}\t{}\n", i + 1, line));
            }
            output = numbered;
        }

        Ok(ExecResult {
            stdout: output,
            stderr,
            exit_code,
        })
    }
}
