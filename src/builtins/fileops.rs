//! File manipulation builtins - mkdir, touch, rm

use async_trait::async_trait;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The mkdir builtin - create directories.
///
/// Usage: mkdir [-p] DIRECTORY...
pub struct Mkdir;

#[async_trait]
impl Builtin for Mkdir {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let recursive = ctx.args.iter().any(|a| a == "-p");
        let dirs: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if dirs.is_empty() {
            return Ok(ExecResult::err("mkdir: missing operand\n".to_string(), 1));
        }

        let mut stderr = String::new();
        let mut exit_code = 0;
        for dir in dirs {
            let path = resolve_path(ctx.cwd, dir);
            if let Err(error) = ctx.fs.mkdir(&path, recursive).await {
                stderr.push_str(&format!("mkdir: cannot create directory '{}': {}\n", dir, error));
                exit_code = 1;
            }
        }
        Ok(ExecResult {
            stdout: String::new(),
            stderr,
            exit_code,
        })
    }
}

/// The touch builtin - create empty files.
///
/// Usage: touch FILE...
pub struct Touch;

#[async_trait]
impl Builtin for Touch {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let files: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if files.is_empty() {
            return Ok(ExecResult::err("touch: missing file operand\n".to_string(), 1));
        }

        let mut stderr = String::new();
        let mut exit_code = 0;
        for file in files {
            let path = resolve_path(ctx.cwd, file);
            // Existing files keep their contents
            if ctx.fs.exists(&path).await.unwrap_or(false) {
                continue;
            }
            if let Err(error) = ctx.fs.write_file(&path, b"").await {
                stderr.push_str(&format!("touch: cannot touch '{}': {}\n", file, error));
                exit_code = 1;
            }
        }
        Ok(ExecResult {
            stdout: String::new(),
            stderr,
            exit_code,
        })
    }
}

/// The rm builtin - remove files and directories.
///
/// Usage: rm [-r] [-f] PATH...
pub struct Rm;

#[async_trait]
impl Builtin for Rm {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut recursive = false;
        let mut force = false;
        let mut paths: Vec<&str> = Vec::new();

        for arg in ctx.args {
            match arg.as_str() {
                "-r" | "-R" => recursive = true,
                "-f" => force = true,
                "-rf" | "-fr" => {
                    recursive = true;
                    force = true;
                }
                s if s.starts_with('-') && s.len() > 1 => {
                    return Ok(ExecResult::err(
                        format!("rm: invalid option -- '{}'\n", &s[1..]),
                        1,
                    ));
                }
                s => paths.push(s),
            }
        }
        if paths.is_empty() {
            return Ok(ExecResult::err("rm: missing operand\n".to_string(), 1));
        }

        let mut stderr = String::new();
        let mut exit_code = 0;
        for path_str in paths {
            let path = resolve_path(ctx.cwd, path_str);

            match ctx.fs.stat(&path).await {
                Ok(meta) => {
                    if meta.file_type.is_dir() && !recursive {
                        stderr.push_str(&format!(
                            "rm: cannot remove '{}': Is a directory\n",
                            path_str
                        ));
                        exit_code = 1;
                        continue;
                    }
                    if let Err(error) = ctx.fs.remove(&path, recursive).await {
                        stderr.push_str(&format!("rm: cannot remove '{}': {}\n", path_str, error));
                        exit_code = 1;
                    }
                }
                Err(_) => {
                    if !force {
                        stderr.push_str(&format!(
                            "rm: cannot remove '{}': No such file or directory\n",
                            path_str
                        ));
                        exit_code = 1;
                    }
                }
            }
        }
        Ok(ExecResult {
            stdout: String::new(),
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
    use crate::fs::FileSystem;
    use std::path::Path;

    #[tokio::test]
    async fn mkdir_creates_directory() {
        let t = TestCtx::new();
        let a = args(&["/tmp/newdir"]);
        let result = Mkdir.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(t.fs.exists(Path::new("/tmp/newdir")).await.unwrap());
    }

    #[tokio::test]
    async fn mkdir_p_creates_parents() {
        let t = TestCtx::new();
        let a = args(&["-p", "/tmp/a/b/c"]);
        let result = Mkdir.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(t.fs.exists(Path::new("/tmp/a/b/c")).await.unwrap());
    }

    #[tokio::test]
    async fn mkdir_without_parent_fails() {
        let t = TestCtx::new();
        let a = args(&["/no/parent/here"]);
        let result = Mkdir.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("mkdir: cannot create directory"));
    }

    #[tokio::test]
    async fn touch_creates_and_preserves() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/existing"), b"content");
        let a = args(&["/tmp/existing", "/tmp/fresh"]);
        let result = Touch.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(
            t.fs.read_file(Path::new("/tmp/existing")).await.unwrap(),
            b"content"
        );
        assert!(t.fs.exists(Path::new("/tmp/fresh")).await.unwrap());
    }

    #[tokio::test]
    async fn rm_removes_file() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/f"), b"x");
        let a = args(&["/tmp/f"]);
        let result = Rm.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(!t.fs.exists(Path::new("/tmp/f")).await.unwrap());
    }

    #[tokio::test]
    async fn rm_directory_requires_r() {
        let t = TestCtx::new();
        t.fs.seed_file(Path::new("/tmp/d/f"), b"x");
        let a = args(&["/tmp/d"]);
        let result = Rm.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("Is a directory"));

        let a = args(&["-r", "/tmp/d"]);
        let result = Rm.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(!t.fs.exists(Path::new("/tmp/d")).await.unwrap());
    }

    #[tokio::test]
    async fn rm_f_ignores_missing() {
        let t = TestCtx::new();
        let a = args(&["-f", "/missing"]);
        let result = Rm.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 0);

        let a = args(&["/missing"]);
        let result = Rm.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.exit_code, 1);
    }
}
