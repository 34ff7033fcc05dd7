//! Built-in shell commands
//!
//! Registry commands are synchronous string transformers behind the
//! [`Builtin`] trait. They receive an immutable [`Context`] snapshot;
//! anything that mutates shell state is handled by the evaluator instead.

mod cat;
mod echo;
mod fileops;
mod find;
mod flow;
mod grep;
mod headtail;
mod inspect;
mod ls;
mod navigation;
mod pipeline;
mod test;
mod wc;

pub use cat::Cat;
pub use echo::Echo;
pub use fileops::{Mkdir, Rm, Touch};
pub use find::Find;
pub use flow::{False, True};
pub use grep::Grep;
pub use headtail::{Head, Tail};
pub use inspect::Stat;
pub use ls::Ls;
pub use navigation::Pwd;
pub use pipeline::Xargs;
pub use test::Test;
pub use wc::Wc;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;
use crate::interpreter::ExecResult;

/// Context for builtin command execution. An immutable snapshot of the shell
/// state at dispatch time; builtins must not (and cannot) mutate it.
pub struct Context<'a> {
    /// Command arguments (not including the command name)
    pub args: &'a [String],
    /// Variable snapshot
    pub env: &'a HashMap<String, String>,
    /// Current working directory
    pub cwd: &'a Path,
    /// Filesystem
    pub fs: Arc<dyn FileSystem>,
    /// Piped or redirected standard input
    pub stdin: Option<&'a str>,
    /// Runner for invoking sub-commands (`xargs`, `find -exec`), bound to a
    /// clone of the current state
    pub exec: Option<&'a dyn CommandRunner>,
}

/// Trait for builtin commands.
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Execute the builtin command.
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult>;
}

/// Capability for running a command line from inside a builtin. The shell
/// injects an implementation bound to a clone of the current state that
/// shares the execution budget.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments, feeding `stdin`.
    async fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<ExecResult>;
}

/// Build the default command registry.
pub(crate) fn default_registry() -> HashMap<&'static str, Box<dyn Builtin>> {
    let mut registry: HashMap<&'static str, Box<dyn Builtin>> = HashMap::new();
    registry.insert("echo", Box::new(Echo));
    registry.insert("cat", Box::new(Cat));
    registry.insert("true", Box::new(True));
    registry.insert("false", Box::new(False));
    registry.insert("pwd", Box::new(Pwd));
    registry.insert("test", Box::new(Test));
    registry.insert("[", Box::new(Test));
    registry.insert("wc", Box::new(Wc));
    registry.insert("head", Box::new(Head));
    registry.insert("tail", Box::new(Tail));
    registry.insert("grep", Box::new(Grep));
    registry.insert("ls", Box::new(Ls));
    registry.insert("stat", Box::new(Stat));
    registry.insert("mkdir", Box::new(Mkdir));
    registry.insert("touch", Box::new(Touch));
    registry.insert("rm", Box::new(Rm));
    registry.insert("xargs", Box::new(Xargs));
    registry.insert("find", Box::new(Find));
    registry
}

/// Resolve a path argument against the context's working directory.
pub(crate) fn resolve_path(cwd: &Path, path: &str) -> std::path::PathBuf {
    crate::fs::resolve_path(cwd, path)
}
