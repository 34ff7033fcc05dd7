//! ls builtin command

use async_trait::async_trait;
use std::path::Path;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The ls builtin - list directory contents, one entry per line, sorted.
///
/// Usage: ls [-a] [PATH...]
///
/// Options:
///   -a   Show hidden entries (starting with .)
pub struct Ls;

#[async_trait]
impl Builtin for Ls {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut all = false;
        let mut paths: Vec<&str> = Vec::new();

        for arg in ctx.args {
            match arg.as_str() {
                "-a" => all = true,
                s if s.starts_with('-') && s.len() > 1 => {
                    return Ok(ExecResult::err(
                        format!("ls: invalid option -- '{}'\n", &s[1..]),
                        2,
                    ));
                }
                s => paths.push(s),
            }
        }
        if paths.is_empty() {
            paths.push(".");
        }

        let mut output = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let multiple = paths.len() > 1;

        for (i, path_str) in paths.iter().enumerate() {
            let path = resolve_path(ctx.cwd, path_str);
            let meta = match ctx.fs.stat(&path).await {
                Ok(meta) => meta,
                Err(_) => {
                    stderr.push_str(&format!(
                        "ls: cannot access '{}': No such file or directory\n",
                        path_str
                    ));
                    exit_code = 2;
                    continue;
                }
            };

            if meta.file_type.is_file() {
                let name = Path::new(path_str)
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path_str.to_string());
                output.push_str(&name);
                output.push('\n');
                continue;
            }

            if multiple {
                if i > 0 {
                    output.push('\n');
                }
                output.push_str(&format!("{}:\n", path_str));
            }
            let mut entries = ctx.fs.read_dir(&path).await?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                if !all && entry.name.starts_with('.') {
                    continue;
                }
                output.push_str(&entry.name);
                output.push('\n');
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

    #[tokio::test]
    async fn ls_lists_sorted() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/home/user/b.txt"), b"");
        t.fs.seed_file(Path::new("/home/user/a.txt"), b"");
        let a = args(&[]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "a.txt\nb.txt\n");
    }

    #[tokio::test]
    async fn ls_hides_dotfiles_without_a() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/home/user/.hidden"), b"");
        t.fs.seed_file(Path::new("/home/user/shown"), b"");
        let a = args(&[]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "shown\n");

        let a = args(&["-a"]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, ".hidden\nshown\n");
    }

    #[tokio::test]
    async fn ls_single_file_prints_name() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/f.txt"), b"");
        let a = args(&["/tmp/f.txt"]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "f.txt\n");
    }

    #[tokio::test]
    async fn ls_missing_path_exits_two() {
        let t = TestCtx::new();
        let a = args(&["/missing"]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.contains("cannot access '/missing'"));
    }

    #[tokio::test]
    async fn ls_multiple_dirs_have_headers() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/x"), b"");
        let a = args(&["/tmp", "/bin"]);
        let result = Ls.execute(t.ctx(&a)).await.unwrap();
        assert!(result.stdout.starts_with("/tmp:\n"));
        assert!(result.stdout.contains("\n/bin:\n"));
    }
}
