//! State-mutating builtins
//!
//! Registry commands receive an immutable state snapshot, so everything that
//! mutates the shell (`cd`, `export`, `unset`, `set`, `local`, `shift`,
//! `read`) or drives control flow (`exit`, `return`, `break`, `continue`,
//! `:`) bypasses the registry and is handled here, inside the evaluator.

use super::state::{ControlFlow, Output, Status, Variable};
use super::Interpreter;
use crate::error::Result;
use crate::fs::resolve_path;
use crate::parser::is_identifier;

impl Interpreter {
    /// Run a state-mutating builtin if `name` is one. Returns the produced
    /// output (for redirect routing) and the resulting status.
    pub(crate) async fn run_special(
        &mut self,
        name: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Option<Result<(Output, Status)>> {
        let result = match name {
            ":" => Ok((Output::default(), Status::ok())),
            "cd" => self.builtin_cd(args).await,
            "export" => self.builtin_export(args),
            "unset" => self.builtin_unset(args),
            "set" => self.builtin_set(args),
            "local" => self.builtin_local(args),
            "shift" => self.builtin_shift(args),
            "read" => self.builtin_read(args, stdin),
            "exit" => self.builtin_exit(args),
            "return" => self.builtin_return(args),
            "break" => self.builtin_break_continue(args, true),
            "continue" => self.builtin_break_continue(args, false),
            _ => return None,
        };
        Some(result)
    }

    async fn builtin_cd(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let target = match args.first() {
            Some(path) => path.clone(),
            None => self.var_value("HOME"),
        };
        let path = resolve_path(self.cwd(), &target);

        let mut out = Output::default();
        match self.fs().stat(&path).await {
            Ok(meta) if meta.file_type.is_dir() => {
                self.set_cwd(path);
                Ok((out, Status::ok()))
            }
            Ok(_) => {
                out.stderr
                    .push_str(&format!("cd: {}: Not a directory\n", target));
                Ok((out, Status::code(1)))
            }
            Err(_) => {
                out.stderr
                    .push_str(&format!("cd: {}: No such file or directory\n", target));
                Ok((out, Status::code(1)))
            }
        }
    }

    fn builtin_export(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let mut out = Output::default();

        if args.is_empty() {
            let mut exported: Vec<(&String, &Variable)> = self
                .variables
                .iter()
                .filter(|(_, v)| v.exported)
                .collect();
            exported.sort_by(|a, b| a.0.cmp(b.0));
            for (name, variable) in exported {
                out.stdout
                    .push_str(&format!("declare -x {}=\"{}\"\n", name, variable.value));
            }
            return Ok((out, Status::ok()));
        }

        let mut status = Status::ok();
        for arg in args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg.as_str(), None),
            };
            if !is_identifier(name) {
                out.stderr
                    .push_str(&format!("export: `{}': not a valid identifier\n", arg));
                status = Status::code(1);
                continue;
            }
            match self.variables.get_mut(name) {
                Some(variable) => {
                    if let Some(value) = value {
                        variable.value = value.to_string();
                    }
                    variable.exported = true;
                }
                None => {
                    self.variables.insert(
                        name.to_string(),
                        Variable::exported(value.unwrap_or_default()),
                    );
                }
            }
        }
        Ok((out, status))
    }

    fn builtin_unset(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let mut functions_only = false;
        for arg in args {
            match arg.as_str() {
                "-f" => functions_only = true,
                "-v" => functions_only = false,
                name => {
                    if functions_only {
                        self.functions.remove(name);
                    } else {
                        // Unsetting clears the value and the export flag
                        self.variables.remove(name);
                    }
                }
            }
        }
        Ok((Output::default(), Status::ok()))
    }

    fn builtin_set(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let mut out = Output::default();

        if args.is_empty() {
            let mut names: Vec<&String> = self.variables.keys().collect();
            names.sort();
            for name in names {
                if let Some(variable) = self.variables.get(name) {
                    out.stdout
                        .push_str(&format!("{}={}\n", name, variable.value));
                }
            }
            return Ok((out, Status::ok()));
        }

        let mut i = 0;
        while i < args.len() {
            if args[i] == "--" {
                let positionals: Vec<String> = args[i + 1..].to_vec();
                match self.positional.last_mut() {
                    Some(frame) => *frame = positionals,
                    None => self.positional.push(positionals),
                }
                break;
            }
            // Option flags are accepted and ignored; this shell has no
            // errexit/xtrace modes
            i += 1;
        }
        Ok((out, Status::ok()))
    }

    fn builtin_local(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let mut out = Output::default();
        if self.locals.is_empty() {
            out.stderr
                .push_str("local: can only be used in a function\n");
            return Ok((out, Status::code(1)));
        }

        for arg in args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, value.to_string()),
                None => (arg.as_str(), String::new()),
            };
            if !is_identifier(name) {
                out.stderr
                    .push_str(&format!("local: `{}': not a valid identifier\n", arg));
                return Ok((out, Status::code(1)));
            }
            let shadow = self.variables.get(name).cloned();
            if let Some(frame) = self.locals.last_mut() {
                frame.push((name.to_string(), shadow));
            }
            self.variables
                .insert(name.to_string(), Variable::new(value));
        }
        Ok((out, Status::ok()))
    }

    fn builtin_shift(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let count: usize = match args.first() {
            Some(arg) => match arg.parse() {
                Ok(n) => n,
                Err(_) => {
                    let mut out = Output::default();
                    out.stderr
                        .push_str(&format!("shift: {}: numeric argument required\n", arg));
                    return Ok((out, Status::code(1)));
                }
            },
            None => 1,
        };

        let frame = match self.positional.last_mut() {
            Some(frame) => frame,
            None => return Ok((Output::default(), Status::code(1))),
        };
        if count > frame.len() {
            return Ok((Output::default(), Status::code(1)));
        }
        frame.drain(..count);
        Ok((Output::default(), Status::ok()))
    }

    /// `read [var...]`: consume the first line of stdin, split it on IFS
    /// over the variables; the last variable takes the remainder. EOF (no
    /// stdin) leaves the variables empty and fails.
    fn builtin_read(&mut self, args: &[String], stdin: Option<&str>) -> Result<(Output, Status)> {
        let default_var = ["REPLY".to_string()];
        let vars: &[String] = if args.is_empty() { &default_var } else { args };

        let line = match stdin {
            Some(data) if !data.is_empty() => data.lines().next().unwrap_or("").to_string(),
            _ => {
                for name in vars {
                    self.set_var(name, "");
                }
                return Ok((Output::default(), Status::code(1)));
            }
        };

        let mut remainder = line.trim_start_matches([' ', '\t']);
        for (i, name) in vars.iter().enumerate() {
            if i + 1 == vars.len() {
                self.set_var(name, remainder.trim_end_matches([' ', '\t']));
            } else {
                let mut split = remainder.splitn(2, [' ', '\t']);
                let field = split.next().unwrap_or("");
                self.set_var(name, field);
                remainder = split.next().unwrap_or("").trim_start_matches([' ', '\t']);
            }
        }
        Ok((Output::default(), Status::ok()))
    }

    fn builtin_exit(&mut self, args: &[String]) -> Result<(Output, Status)> {
        let code = args
            .first()
            .and_then(|a| a.parse().ok())
            .unwrap_or(self.last_exit_code);
        Ok((Output::default(), Status::flow(code, ControlFlow::Exit(code))))
    }

    fn builtin_return(&mut self, args: &[String]) -> Result<(Output, Status)> {
        if self.locals.is_empty() {
            let mut out = Output::default();
            out.stderr
                .push_str("return: can only be used in a function\n");
            return Ok((out, Status::code(1)));
        }
        let code = args
            .first()
            .and_then(|a| a.parse().ok())
            .unwrap_or(self.last_exit_code);
        Ok((
            Output::default(),
            Status::flow(code, ControlFlow::Return(code)),
        ))
    }

    fn builtin_break_continue(
        &mut self,
        args: &[String],
        is_break: bool,
    ) -> Result<(Output, Status)> {
        let name = if is_break { "break" } else { "continue" };

        // Outside any loop this is a warning, not an error; the script
        // keeps running
        if self.loop_depth == 0 {
            let mut out = Output::default();
            out.stderr.push_str(&format!(
                "{}: only meaningful in a 'for', 'while', or 'until' loop\n",
                name
            ));
            return Ok((out, Status::ok()));
        }

        let count: u32 = args
            .first()
            .and_then(|a| a.parse().ok())
            .filter(|&n| n >= 1)
            .unwrap_or(1);
        // A count beyond the nesting exits every enclosing loop
        let count = count.min(self.loop_depth as u32);
        let flow = if is_break {
            ControlFlow::Break(count)
        } else {
            ControlFlow::Continue(count)
        };
        Ok((Output::default(), Status::flow(0, flow)))
    }
}
