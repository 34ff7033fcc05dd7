//! vbash - sandboxed in-process bash interpreter over a virtual filesystem
//!
//! A shell instance is seeded with an in-memory file tree and a working
//! directory; submitted command lines are parsed, evaluated, and answered
//! with the combined stdout, stderr and a numeric exit status. No host
//! operating system resources are touched, and runaway scripts are stopped
//! by execution budgets (command count, recursion depth, loop iterations).
//!
//! # Example
//!
//! ```rust
//! use vbash::Shell;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut shell = Shell::new();
//!     let result = shell.exec("echo hello").await;
//!     assert_eq!(result.stdout, "hello\n");
//!     assert_eq!(result.exit_code, 0);
//! }
//! ```

mod builtins;
mod error;
mod fs;
mod interpreter;
mod limits;
mod parser;

pub use builtins::{Builtin, CommandRunner, Context};
pub use error::{Error, Result};
pub use fs::{DirEntry, FileSystem, FileType, InMemoryFs, Metadata};
pub use interpreter::ExecResult;
pub use limits::ExecutionLimits;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use interpreter::Interpreter;
use parser::Parser;

/// Main entry point: a persistent shell over a virtual filesystem.
///
/// Variables and functions persist across `exec` calls; the execution
/// budgets are reset at each call.
pub struct Shell {
    fs: Arc<dyn FileSystem>,
    interpreter: Interpreter,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    /// Create a new shell with an empty in-memory filesystem and default
    /// settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for customized configuration.
    pub fn builder() -> ShellBuilder {
        ShellBuilder::default()
    }

    /// Execute a command line and return the aggregated output.
    ///
    /// Never panics and never returns an error: parse failures come back as
    /// `exit_code` 2 with the diagnostic on stderr, runtime failures as the
    /// command's own exit code.
    pub async fn exec(&mut self, line: &str) -> ExecResult {
        let script = match Parser::new(line).parse() {
            Ok(script) => script,
            Err(error) => return ExecResult::err(format!("{}\n", error), 2),
        };
        self.interpreter.run(&script).await
    }

    /// The shell's filesystem, for direct inspection from the embedder.
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }
}

/// Builder for customized [`Shell`] configuration.
#[derive(Default)]
pub struct ShellBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    files: Vec<(PathBuf, Vec<u8>)>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    limits: Option<ExecutionLimits>,
}

impl ShellBuilder {
    /// Use a custom filesystem. Seed files added with [`Self::file`] only
    /// apply to the default in-memory filesystem.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Seed a file (parent directories are created as needed).
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Set an environment variable (exported).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the initial working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Override the execution budgets.
    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Build the shell instance.
    pub fn build(self) -> Shell {
        let fs: Arc<dyn FileSystem> = match self.fs {
            Some(fs) => fs,
            None => {
                let memory = InMemoryFs::new();
                for (path, content) in &self.files {
                    memory.seed_file(path, content);
                }
                Arc::new(memory)
            }
        };

        let registry: HashMap<&'static str, Box<dyn Builtin>> = builtins::default_registry();
        let mut interpreter = Interpreter::new(
            Arc::clone(&fs),
            Arc::new(registry),
            self.limits.unwrap_or_default(),
        );

        for (key, value) in self.env {
            interpreter.set_env(&key, &value);
        }
        if let Some(cwd) = self.cwd {
            interpreter.set_cwd(cwd);
        }

        Shell { fs, interpreter }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_echo_hello() {
        let mut shell = Shell::new();
        let result = shell.exec("echo hello").await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_variable_expansion() {
        let mut shell = Shell::builder().env("GREETING", "hi there").build();
        let result = shell.exec("echo $GREETING").await;
        assert_eq!(result.stdout, "hi there\n");
    }

    #[tokio::test]
    async fn test_undefined_variable_expands_to_empty() {
        let mut shell = Shell::new();
        let result = shell.exec("echo $UNDEFINED_VAR").await;
        assert_eq!(result.stdout, "\n");
    }

    #[tokio::test]
    async fn test_variables_persist_across_exec() {
        let mut shell = Shell::new();
        shell.exec("X=42").await;
        let result = shell.exec("echo $X").await;
        assert_eq!(result.stdout, "42\n");
    }

    #[tokio::test]
    async fn test_pipeline() {
        let mut shell = Shell::new();
        let result = shell.exec("echo hello | cat").await;
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_redirect_and_read_back() {
        let mut shell = Shell::new();
        let result = shell.exec("echo hello > /tmp/test.txt").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);

        let result = shell.exec("cat /tmp/test.txt").await;
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_seeded_files() {
        let mut shell = Shell::builder()
            .file("/data/notes.txt", "seeded content\n")
            .build();
        let result = shell.exec("cat /data/notes.txt").await;
        assert_eq!(result.stdout, "seeded content\n");
    }

    #[tokio::test]
    async fn test_parse_error_exit_code_two() {
        let mut shell = Shell::new();
        let result = shell.exec("echo 'unterminated").await;
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "syntax error: unexpected end of input\n");
    }

    #[tokio::test]
    async fn test_command_not_found() {
        let mut shell = Shell::new();
        let result = shell.exec("no_such_command").await;
        assert_eq!(result.exit_code, 127);
        assert_eq!(result.stderr, "no_such_command: command not found\n");
    }

    #[tokio::test]
    async fn test_custom_limits() {
        let mut shell = Shell::builder()
            .limits(ExecutionLimits::new().max_commands(3))
            .build();
        let result = shell.exec("echo 1; echo 2; echo 3; echo 4").await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("too many commands"));
        // Output before the abort is preserved
        assert_eq!(result.stdout, "1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_fs_accessor() {
        let mut shell = Shell::new();
        shell.exec("echo data > /tmp/out").await;
        let content = shell.fs().read_file(Path::new("/tmp/out")).await.unwrap();
        assert_eq!(content, b"data\n");
    }
}
