//! Pipeline control builtins - xargs

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The xargs builtin - build and execute command lines from stdin.
///
/// Usage: xargs [-n MAX-ARGS] [-I REPLACE] [COMMAND [ARGS...]]
///
/// Options:
///   -n MAX-ARGS  Use at most MAX-ARGS arguments per command
///   -I REPLACE   Replace REPLACE in ARGS with the input item (implies -n 1)
///
/// Commands run through the shell's injected runner; the exit code is the
/// highest exit code of any invocation.
pub struct Xargs;

#[async_trait]
impl Builtin for Xargs {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut max_args: Option<usize> = None;
        let mut replace: Option<String> = None;
        let mut command: Vec<String> = Vec::new();

        let mut i = 0;
        while i < ctx.args.len() {
            match ctx.args[i].as_str() {
                "-n" => {
                    i += 1;
                    let value = match ctx.args.get(i) {
                        Some(v) => v,
                        None => {
                            return Ok(ExecResult::err(
                                "xargs: option requires an argument -- 'n'\n".to_string(),
                                1,
                            ))
                        }
                    };
                    match value.parse::<usize>() {
                        Ok(n) if n > 0 => max_args = Some(n),
                        _ => {
                            return Ok(ExecResult::err(
                                format!("xargs: invalid number: '{}'\n", value),
                                1,
                            ))
                        }
                    }
                }
                "-I" => {
                    i += 1;
                    match ctx.args.get(i) {
                        Some(v) => {
                            replace = Some(v.clone());
                            max_args = Some(1);
                        }
                        None => {
                            return Ok(ExecResult::err(
                                "xargs: option requires an argument -- 'I'\n".to_string(),
                                1,
                            ))
                        }
                    }
                }
                s if s.starts_with('-') && s.len() > 1 => {
                    return Ok(ExecResult::err(
                        format!("xargs: invalid option -- '{}'\n", &s[1..]),
                        1,
                    ));
                }
                _ => {
                    command.extend(ctx.args[i..].iter().cloned());
                    break;
                }
            }
            i += 1;
        }
        if command.is_empty() {
            command.push("echo".to_string());
        }

        let runner = match ctx.exec {
            Some(runner) => runner,
            None => {
                return Ok(ExecResult::err(
                    "xargs: command execution unavailable\n".to_string(),
                    1,
                ))
            }
        };

        let input = ctx.stdin.unwrap_or("");
        let items: Vec<&str> = input.split_whitespace().collect();
        if items.is_empty() {
            return Ok(ExecResult::ok(String::new()));
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        let chunk_size = max_args.unwrap_or(items.len());
        for chunk in items.chunks(chunk_size) {
            let argv: Vec<String> = match &replace {
                Some(token) => command
                    .iter()
                    .map(|arg| arg.replace(token.as_str(), chunk[0]))
                    .collect(),
                None => command
                    .iter()
                    .cloned()
                    .chain(chunk.iter().map(|s| s.to_string()))
                    .collect(),
            };
            let result = runner.run(&argv, None).await?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = exit_code.max(result.exit_code);
        }

        Ok(ExecResult {
            stdout,
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
    use crate::builtins::CommandRunner;
    use std::sync::Mutex;

    /// Recording runner standing in for the shell's state runner.
    struct EchoRunner {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CommandRunner for EchoRunner {
        async fn run(&self, argv: &[String], _stdin: Option<&str>) -> Result<ExecResult> {
            self.calls.lock().unwrap().push(argv.to_vec());
            Ok(ExecResult::ok(format!("{}\n", argv[1..].join(" "))))
        }
    }

    #[tokio::test]
    async fn xargs_appends_items() {
        let t = TestCtx::new();
        let runner = EchoRunner {
            calls: Mutex::new(Vec::new()),
        };
        let a = args(&["echo"]);
        let mut ctx = t.ctx_with_stdin(&a, "one two three");
        ctx.exec = Some(&runner);
        let result = Xargs.execute(ctx).await.unwrap();
        assert_eq!(result.stdout, "one two three\n");
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn xargs_n_chunks_invocations() {
        let t = TestCtx::new();
        let runner = EchoRunner {
            calls: Mutex::new(Vec::new()),
        };
        let a = args(&["-n", "1", "echo"]);
        let mut ctx = t.ctx_with_stdin(&a, "a b");
        ctx.exec = Some(&runner);
        let result = Xargs.execute(ctx).await.unwrap();
        assert_eq!(result.stdout, "a\nb\n");
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn xargs_i_substitutes_token() {
        let t = TestCtx::new();
        let runner = EchoRunner {
            calls: Mutex::new(Vec::new()),
        };
        let a = args(&["-I", "{}", "echo", "got:{}"]);
        let mut ctx = t.ctx_with_stdin(&a, "x y");
        ctx.exec = Some(&runner);
        let result = Xargs.execute(ctx).await.unwrap();
        assert_eq!(result.stdout, "got:x\ngot:y\n");
    }

    #[tokio::test]
    async fn xargs_empty_input_is_noop() {
        let t = TestCtx::new();
        let runner = EchoRunner {
            calls: Mutex::new(Vec::new()),
        };
        let a = args(&["echo"]);
        let mut ctx = t.ctx_with_stdin(&a, "");
        ctx.exec = Some(&runner);
        let result = Xargs.execute(ctx).await.unwrap();
        assert_eq!(result.stdout, "");
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
