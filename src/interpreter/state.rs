//! Interpreter state types

/// Result of executing a script, returned by [`Shell::exec`](crate::Shell::exec).
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code, in `[0, 255]`
    pub exit_code: i32,
}

impl ExecResult {
    /// Create a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Create a failed result with the given stderr.
    pub fn err(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Create a result with stdout and a custom exit code.
    pub fn with_code(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code,
        }
    }

    /// Check whether the result indicates success.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Control flow signals raised by `break`, `continue`, `return` and `exit`,
/// propagated through the evaluation and handled at the enclosing loop,
/// function frame, or script top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ControlFlow {
    #[default]
    None,
    /// Break out of `n` enclosing loops
    Break(u32),
    /// Continue the `n`th enclosing loop
    Continue(u32),
    /// Return from the current function with an exit code
    Return(i32),
    /// Terminate the whole script with an exit code
    Exit(i32),
}

/// Internal outcome of evaluating one command.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Status {
    pub code: i32,
    pub flow: ControlFlow,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn code(code: i32) -> Self {
        Self {
            code,
            flow: ControlFlow::None,
        }
    }

    pub fn flow(code: i32, flow: ControlFlow) -> Self {
        Self { code, flow }
    }
}

/// Per-exec output buffers. Evaluation appends in order; pipeline stages and
/// command substitutions capture into their own instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// A shell variable: value plus export flag.
#[derive(Debug, Clone, Default)]
pub(crate) struct Variable {
    pub value: String,
    pub exported: bool,
}

impl Variable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            exported: false,
        }
    }

    pub fn exported(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            exported: true,
        }
    }
}

/// A registered shell function: AST body plus the source text kept for
/// diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct Function {
    pub body: crate::parser::Command,
    #[allow(dead_code)] // diagnostics only
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_result_ok() {
        let r = ExecResult::ok("hello");
        assert_eq!(r.stdout, "hello");
        assert_eq!(r.stderr, "");
        assert_eq!(r.exit_code, 0);
        assert!(r.is_success());
    }

    #[test]
    fn exec_result_err() {
        let r = ExecResult::err("bad command", 127);
        assert_eq!(r.stdout, "");
        assert_eq!(r.stderr, "bad command");
        assert_eq!(r.exit_code, 127);
        assert!(!r.is_success());
    }

    #[test]
    fn exec_result_with_code() {
        let r = ExecResult::with_code("partial", 2);
        assert_eq!(r.stdout, "partial");
        assert_eq!(r.exit_code, 2);
    }

    #[test]
    fn control_flow_default_is_none() {
        assert_eq!(ControlFlow::default(), ControlFlow::None);
    }

    #[test]
    fn status_helpers() {
        assert_eq!(Status::ok().code, 0);
        assert_eq!(Status::code(3).code, 3);
        let s = Status::flow(1, ControlFlow::Break(2));
        assert_eq!(s.flow, ControlFlow::Break(2));
    }

    #[test]
    fn variable_export_flag() {
        assert!(!Variable::new("x").exported);
        assert!(Variable::exported("x").exported);
    }
}
