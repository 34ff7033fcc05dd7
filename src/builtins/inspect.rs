//! stat builtin command

use async_trait::async_trait;
use std::time::UNIX_EPOCH;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The stat builtin - display file status.
///
/// Usage: stat FILE...
pub struct Stat;

#[async_trait]
impl Builtin for Stat {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() {
            return Ok(ExecResult::err("stat: missing operand\n".to_string(), 1));
        }

        let mut output = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for arg in ctx.args {
            let path = resolve_path(ctx.cwd, arg);
            match ctx.fs.stat(&path).await {
                Ok(meta) => {
                    let kind = if meta.file_type.is_dir() {
                        "directory"
                    } else {
                        "regular file"
                    };
                    let mtime = meta
                        .modified
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    output.push_str(&format!("  File: {}\n", arg));
                    output.push_str(&format!("  Size: {}\n", meta.size));
                    output.push_str(&format!("  Type: {}\n", kind));
                    output.push_str(&format!("Modify: {}\n", mtime));
                }
                Err(_) => {
                    stderr.push_str(&format!(
                        "stat: cannot stat '{}': No such file or directory\n",
                        arg
                    ));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult {
            stdout: output,
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
    async fn stat_reports_file() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/f.txt"), b"hello");
        let a = args(&["/tmp/f.txt"]);
        let result = Stat.execute(t.ctx(&a)).await.unwrap();
        assert!(result.stdout.contains("File: /tmp/f.txt"));
        assert!(result.stdout.contains("Size: 5"));
        assert!(result.stdout.contains("Type: regular file"));
    }

    #[tokio::test]
    async fn stat_reports_directory() {
        let t = TestCtx::new();
        let a = args(&["/tmp"]);
        let result = Stat.execute(t.ctx(&a)).await.unwrap();
        assert!(result.stdout.contains("Type: directory"));
    }

    #[tokio::test]
    async fn stat_missing_file_continues() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/f"), b"");
        let a = args(&["/missing", "/tmp/f"]);
        let result = Stat.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("cannot stat '/missing'"));
        assert!(result.stdout.contains("File: /tmp/f"));
    }
}
