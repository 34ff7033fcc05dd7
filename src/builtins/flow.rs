//! Exit status builtins - true, false

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The true builtin - always succeeds.
pub struct True;

#[async_trait]
impl Builtin for True {
    async fn execute(&self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(String::new()))
    }
}

/// The false builtin - always fails.
pub struct False;

#[async_trait]
impl Builtin for False {
    async fn execute(&self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::with_code(String::new(), 1))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{args, TestCtx};

    #[tokio::test]
    async fn true_exits_zero() {
        let t = TestCtx::new();
        let a = args(&[]);
        assert_eq!(True.execute(t.ctx(&a)).await.unwrap().exit_code, 0);
    }

    #[tokio::test]
    async fn false_exits_one() {
        let t = TestCtx::new();
        let a = args(&[]);
        assert_eq!(False.execute(t.ctx(&a)).await.unwrap().exit_code, 1);
    }
}
