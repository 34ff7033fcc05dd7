//! Working directory builtins - pwd
//!
//! `cd` mutates shell state and is handled by the evaluator.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The pwd builtin - print the working directory.
pub struct Pwd;

#[async_trait]
impl Builtin for Pwd {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(format!("{}\n", ctx.cwd.display())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};

    #[tokio::test]
    async fn pwd_prints_cwd() {
        let t = TestCtx::new();
        let a = args(&[]);
        let result = Pwd.execute(t.ctx(&a)).await.unwrap();
        assert_eq!(result.stdout, "/home/user\n");
    }
}
