//! Interpreter for executing shell scripts
//!
//! Walks the AST while maintaining variables, functions, the working
//! directory, positional parameters and the execution budgets. Commands
//! append to per-exec output buffers; pipeline stages and command
//! substitutions capture into their own buffer.

mod arith;
mod expand;
pub(crate) mod glob;
mod special;
mod state;

pub use state::ExecResult;
pub(crate) use state::{ControlFlow, Function, Output, Status, Variable};

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::builtins::{Builtin, CommandRunner, Context};
use crate::error::{Error, Result};
use crate::fs::{resolve_path, FileSystem};
use crate::limits::{ExecutionCounters, ExecutionLimits, LimitExceeded};
use crate::parser::{
    CaseCommand, Command, CommandList, CompoundCommand, ForCommand, IfCommand, ListOperator,
    Parser, Pipeline, Redirect, RedirectKind, Script, SimpleCommand,
};

/// The command registry: name to implementation.
pub(crate) type Registry = Arc<HashMap<&'static str, Box<dyn Builtin>>>;

/// Interpreter state. One instance per shell; subshells and command
/// substitutions run on clones that share the filesystem, registry and
/// budget counters.
pub struct Interpreter {
    fs: Arc<dyn FileSystem>,
    registry: Registry,
    variables: HashMap<String, Variable>,
    functions: HashMap<String, Arc<Function>>,
    cwd: PathBuf,
    arg0: String,
    last_exit_code: i32,
    /// Positional parameter frames; the innermost function call is last
    positional: Vec<Vec<String>>,
    /// `local` shadow stacks, one frame per function call
    locals: Vec<Vec<(String, Option<Variable>)>>,
    /// Number of loops currently executing; `break`/`continue` outside any
    /// loop are no-ops, and counts clamp to this depth
    loop_depth: usize,
    limits: ExecutionLimits,
    counters: Arc<Mutex<ExecutionCounters>>,
}

impl Interpreter {
    /// Create a new interpreter with the given filesystem, registry and
    /// limits, seeded with the default environment.
    pub(crate) fn new(fs: Arc<dyn FileSystem>, registry: Registry, limits: ExecutionLimits) -> Self {
        let mut variables = HashMap::new();
        variables.insert("PATH".to_string(), Variable::exported("/usr/bin:/bin"));
        variables.insert("HOME".to_string(), Variable::exported("/home/user"));
        variables.insert("IFS".to_string(), Variable::new(" \t\n"));
        variables.insert("PS1".to_string(), Variable::new("$ "));

        Self {
            fs,
            registry,
            variables,
            functions: HashMap::new(),
            cwd: PathBuf::from("/home/user"),
            arg0: "vbash".to_string(),
            last_exit_code: 0,
            positional: Vec::new(),
            locals: Vec::new(),
            loop_depth: 0,
            limits,
            counters: Arc::new(Mutex::new(ExecutionCounters::new())),
        }
    }

    /// Set an (exported) environment variable.
    pub(crate) fn set_env(&mut self, key: &str, value: &str) {
        self.variables
            .insert(key.to_string(), Variable::exported(value));
    }

    /// Set the current working directory.
    pub(crate) fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = resolve_path(Path::new("/"), &cwd.to_string_lossy());
    }

    pub(crate) fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub(crate) fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Execute a parsed script: reset the budget, evaluate, convert any
    /// internal error into its diagnostic. Never fails.
    pub(crate) async fn run(&mut self, script: &Script) -> ExecResult {
        self.counters.lock().unwrap().reset();
        let mut out = Output::default();

        let exit_code = match self.run_commands(&script.commands, &mut out, None).await {
            Ok(status) => status.code,
            Err(error) => {
                out.stderr.push_str(&format!("{}\n", error));
                match error {
                    Error::Parse(_) => 2,
                    _ => 1,
                }
            }
        };

        let exit_code = exit_code.rem_euclid(256);
        self.last_exit_code = exit_code;
        ExecResult {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code,
        }
    }

    /// Execute a command sequence, stopping on any control flow signal.
    pub(crate) async fn run_commands(
        &mut self,
        commands: &[Command],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let mut status = Status::ok();
        for command in commands {
            status = self.execute_command(command, out, stdin).await?;
            if status.flow != ControlFlow::None {
                return Ok(status);
            }
        }
        Ok(status)
    }

    pub(crate) fn execute_command<'a>(
        &'a mut self,
        command: &'a Command,
        out: &'a mut Output,
        stdin: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Status>> + Send + 'a>> {
        Box::pin(async move {
            match command {
                Command::Simple(simple) => self.execute_simple(simple, out, stdin).await,
                Command::Pipeline(pipeline) => self.execute_pipeline(pipeline, out, stdin).await,
                Command::List(list) => self.execute_list(list, out, stdin).await,
                Command::Compound(compound, redirects) => {
                    self.execute_compound(compound, redirects, out, stdin).await
                }
                Command::Function(def) => {
                    self.functions.insert(
                        def.name.clone(),
                        Arc::new(Function {
                            body: (*def.body).clone(),
                            source: def.source.clone(),
                        }),
                    );
                    self.last_exit_code = 0;
                    Ok(Status::ok())
                }
            }
        })
    }

    /// Execute a command list (`a && b || c`, `a; b`).
    async fn execute_list(
        &mut self,
        list: &CommandList,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let mut status = self.execute_command(&list.first, out, stdin).await?;
        if status.flow != ControlFlow::None {
            return Ok(status);
        }

        for (op, command) in &list.rest {
            let should_execute = match op {
                ListOperator::And => status.code == 0,
                ListOperator::Or => status.code != 0,
                ListOperator::Semicolon | ListOperator::Background => true,
            };
            if should_execute {
                status = self.execute_command(command, out, stdin).await?;
                if status.flow != ControlFlow::None {
                    return Ok(status);
                }
            }
        }
        Ok(status)
    }

    /// Execute a pipeline: stages run left to right, each receiving the
    /// previous stage's captured stdout as stdin. Stderr of every stage goes
    /// straight through; the exit code is the last stage's.
    async fn execute_pipeline(
        &mut self,
        pipeline: &Pipeline,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let mut carry: Option<String> = stdin.map(str::to_string);
        let mut status = Status::ok();
        let last = pipeline.commands.len() - 1;

        for (i, command) in pipeline.commands.iter().enumerate() {
            if i == last {
                status = self.execute_command(command, out, carry.as_deref()).await?;
            } else {
                let mut stage_out = Output::default();
                self.execute_command(command, &mut stage_out, carry.as_deref())
                    .await?;
                out.stderr.push_str(&stage_out.stderr);
                carry = Some(stage_out.stdout);
            }
        }

        if pipeline.negated {
            status.code = if status.code == 0 { 1 } else { 0 };
        }
        self.last_exit_code = status.code;
        Ok(status)
    }

    async fn execute_compound(
        &mut self,
        compound: &CompoundCommand,
        redirects: &[Redirect],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        if redirects.is_empty() {
            return self.run_compound(compound, out, stdin).await;
        }

        let stdin_data = match self.gather_stdin(redirects, stdin, out).await? {
            Ok(data) => data,
            Err(status) => return Ok(status),
        };

        if !has_output_redirect(redirects) {
            return self.run_compound(compound, out, stdin_data.as_deref()).await;
        }

        let mut captured = Output::default();
        let mut status = self
            .run_compound(compound, &mut captured, stdin_data.as_deref())
            .await?;
        if let Some(code) = self.route_output(captured, redirects, out).await? {
            status.code = code;
        }
        Ok(status)
    }

    async fn run_compound(
        &mut self,
        compound: &CompoundCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        match compound {
            CompoundCommand::If(if_cmd) => self.execute_if(if_cmd, out, stdin).await,
            CompoundCommand::While(while_cmd) => {
                self.execute_loop(&while_cmd.condition, &while_cmd.body, false, out, stdin)
                    .await
            }
            CompoundCommand::Until(until_cmd) => {
                self.execute_loop(&until_cmd.condition, &until_cmd.body, true, out, stdin)
                    .await
            }
            CompoundCommand::For(for_cmd) => self.execute_for(for_cmd, out, stdin).await,
            CompoundCommand::Case(case_cmd) => self.execute_case(case_cmd, out, stdin).await,
            CompoundCommand::Subshell(body) => {
                // Run on a clone; variable, function and cwd changes are
                // discarded, only the exit code and output escape
                let mut sub = self.subshell_clone();
                let status = sub.run_commands(body, out, stdin).await?;
                self.last_exit_code = status.code;
                Ok(Status::code(status.code))
            }
            CompoundCommand::BraceGroup(body) => self.run_commands(body, out, stdin).await,
        }
    }

    async fn execute_if(
        &mut self,
        if_cmd: &IfCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let condition = self.run_commands(&if_cmd.condition, out, stdin).await?;
        if condition.flow != ControlFlow::None {
            return Ok(condition);
        }
        if condition.code == 0 {
            return self.run_commands(&if_cmd.then_branch, out, stdin).await;
        }

        for (elif_condition, elif_body) in &if_cmd.elif_branches {
            let condition = self.run_commands(elif_condition, out, stdin).await?;
            if condition.flow != ControlFlow::None {
                return Ok(condition);
            }
            if condition.code == 0 {
                return self.run_commands(elif_body, out, stdin).await;
            }
        }

        if let Some(else_branch) = &if_cmd.else_branch {
            return self.run_commands(else_branch, out, stdin).await;
        }

        self.last_exit_code = 0;
        Ok(Status::ok())
    }

    /// Shared `while`/`until` loop with the per-loop iteration budget.
    async fn execute_loop(
        &mut self,
        condition: &[Command],
        body: &[Command],
        until: bool,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        self.loop_depth += 1;
        let result = self.run_loop(condition, body, until, out, stdin).await;
        self.loop_depth -= 1;
        result
    }

    async fn run_loop(
        &mut self,
        condition: &[Command],
        body: &[Command],
        until: bool,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let mut iterations = 0usize;
        let mut status = Status::ok();

        loop {
            let cond = self
                .run_commands(condition, out, stdin)
                .await
                .map_err(in_loop_context)?;
            // break/continue in the condition target this loop as well
            match cond.flow {
                ControlFlow::Break(n) => {
                    if n > 1 {
                        return Ok(Status::flow(cond.code, ControlFlow::Break(n - 1)));
                    }
                    return Ok(Status::code(cond.code));
                }
                ControlFlow::Continue(n) => {
                    if n > 1 {
                        return Ok(Status::flow(cond.code, ControlFlow::Continue(n - 1)));
                    }
                    continue;
                }
                ControlFlow::Return(_) | ControlFlow::Exit(_) => return Ok(cond),
                ControlFlow::None => {}
            }
            let continue_loop = if until { cond.code != 0 } else { cond.code == 0 };
            if !continue_loop {
                break;
            }

            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                return Err(LimitExceeded::MaxLoopIterations.into());
            }

            let body_status = self
                .run_commands(body, out, stdin)
                .await
                .map_err(in_loop_context)?;
            status = body_status;
            match status.flow {
                ControlFlow::Break(n) => {
                    status.flow = ControlFlow::None;
                    if n > 1 {
                        return Ok(Status::flow(status.code, ControlFlow::Break(n - 1)));
                    }
                    break;
                }
                ControlFlow::Continue(n) => {
                    status.flow = ControlFlow::None;
                    if n > 1 {
                        return Ok(Status::flow(status.code, ControlFlow::Continue(n - 1)));
                    }
                }
                ControlFlow::Return(_) | ControlFlow::Exit(_) => return Ok(status),
                ControlFlow::None => {}
            }
        }

        Ok(Status::code(status.code))
    }

    async fn execute_for(
        &mut self,
        for_cmd: &ForCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        self.loop_depth += 1;
        let result = self.run_for(for_cmd, out, stdin).await;
        self.loop_depth -= 1;
        result
    }

    async fn run_for(
        &mut self,
        for_cmd: &ForCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        // The post-expansion word list is what gets iterated, and it counts
        // toward the loop cap
        let values: Vec<String> = match &for_cmd.words {
            Some(words) => self.expand_words(words, out).await?,
            None => self.positionals().to_vec(),
        };

        let mut iterations = 0usize;
        let mut status = Status::ok();

        for value in values {
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                return Err(LimitExceeded::MaxLoopIterations.into());
            }

            self.set_var(&for_cmd.variable, &value);
            let body_status = self
                .run_commands(&for_cmd.body, out, stdin)
                .await
                .map_err(in_loop_context)?;
            status = body_status;
            match status.flow {
                ControlFlow::Break(n) => {
                    status.flow = ControlFlow::None;
                    if n > 1 {
                        return Ok(Status::flow(status.code, ControlFlow::Break(n - 1)));
                    }
                    break;
                }
                ControlFlow::Continue(n) => {
                    status.flow = ControlFlow::None;
                    if n > 1 {
                        return Ok(Status::flow(status.code, ControlFlow::Continue(n - 1)));
                    }
                }
                ControlFlow::Return(_) | ControlFlow::Exit(_) => return Ok(status),
                ControlFlow::None => {}
            }
        }

        Ok(Status::code(status.code))
    }

    async fn execute_case(
        &mut self,
        case_cmd: &CaseCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let subject = self.expand_word_single(&case_cmd.subject, out).await?;

        for item in &case_cmd.items {
            for pattern in &item.patterns {
                let pattern = self.expand_word_pattern(pattern, out).await?;
                if glob::glob_match(&pattern, &subject) {
                    return self.run_commands(&item.commands, out, stdin).await;
                }
            }
        }

        self.last_exit_code = 0;
        Ok(Status::ok())
    }

    /// Execute a simple command: budget tick, expansion, assignment
    /// handling, then dispatch.
    async fn execute_simple(
        &mut self,
        command: &SimpleCommand,
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        self.counters
            .lock()
            .unwrap()
            .tick_command(&self.limits)?;

        let args = self.expand_words(&command.words, out).await?;

        // Assignment-only command: assignments take effect on the current
        // state; the exit code is that of the last command substitution
        if args.is_empty() {
            self.last_exit_code = 0;
            for assignment in &command.assignments {
                let value = self.expand_word_single(&assignment.value, out).await?;
                self.set_var(&assignment.name, &value);
            }
            let code = self.last_exit_code;
            return Ok(Status::code(code));
        }

        // Leading assignments scope to this one command
        let mut saved: Vec<(String, Option<Variable>)> = Vec::new();
        for assignment in &command.assignments {
            let value = self.expand_word_single(&assignment.value, out).await?;
            saved.push((
                assignment.name.clone(),
                self.variables.get(&assignment.name).cloned(),
            ));
            self.variables
                .insert(assignment.name.clone(), Variable::exported(value));
        }

        let result = self.dispatch(&args, &command.redirects, out, stdin).await;

        for (name, old) in saved.into_iter().rev() {
            match old {
                Some(variable) => {
                    self.variables.insert(name, variable);
                }
                None => {
                    self.variables.remove(&name);
                }
            }
        }

        let status = result?;
        self.last_exit_code = status.code;
        Ok(status)
    }

    /// Dispatch an expanded command. Lookup order: function, state-mutating
    /// builtin, registry, PATH search over the virtual filesystem.
    async fn dispatch(
        &mut self,
        args: &[String],
        redirects: &[Redirect],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let stdin_data = match self.gather_stdin(redirects, stdin, out).await? {
            Ok(data) => data,
            Err(status) => return Ok(status),
        };
        let stdin = stdin_data.as_deref();
        let name = args[0].as_str();
        let rest = &args[1..];

        if let Some(function) = self.functions.get(name).cloned() {
            return self
                .call_function(function, name, rest, redirects, out, stdin)
                .await;
        }

        if let Some(result) = self.run_special(name, rest, stdin).await {
            let (produced, mut status) = result?;
            if let Some(code) = self.route_output(produced, redirects, out).await? {
                status.code = code;
            }
            return Ok(status);
        }

        let registry = Arc::clone(&self.registry);
        if let Some(builtin) = registry.get(name) {
            let env = self.env_snapshot();
            let runner = StateRunner::new(self.subshell_clone());
            let ctx = Context {
                args: rest,
                env: &env,
                cwd: &self.cwd,
                fs: Arc::clone(&self.fs),
                stdin,
                exec: Some(&runner),
            };
            let result = builtin.execute(ctx).await?;
            return self.route_result(result, redirects, out).await;
        }

        if let Some(script) = self.path_search(name).await? {
            return self.run_script_file(name, &script, rest, redirects, out, stdin).await;
        }

        out.stderr.push_str(&format!("{}: command not found\n", name));
        Ok(Status::code(127))
    }

    /// Call a user-defined function: new positional and local frames, the
    /// recursion budget, `return` handling.
    #[allow(clippy::too_many_arguments)]
    async fn call_function(
        &mut self,
        function: Arc<Function>,
        name: &str,
        args: &[String],
        redirects: &[Redirect],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        self.counters
            .lock()
            .unwrap()
            .push_function(&self.limits)
            .map_err(|limit| Error::Exec(format!("{}: {}", name, limit)))?;
        self.positional.push(args.to_vec());
        self.locals.push(Vec::new());
        // The caller's loops are not visible from inside the function
        let saved_loop_depth = self.loop_depth;
        self.loop_depth = 0;

        let capture = has_output_redirect(redirects);
        let mut captured = Output::default();
        let result = if capture {
            self.execute_command(&function.body, &mut captured, stdin).await
        } else {
            self.execute_command(&function.body, out, stdin).await
        };

        // Unwind the frames even when the body failed
        if let Some(frame) = self.locals.pop() {
            for (name, old) in frame.into_iter().rev() {
                match old {
                    Some(variable) => {
                        self.variables.insert(name, variable);
                    }
                    None => {
                        self.variables.remove(&name);
                    }
                }
            }
        }
        self.positional.pop();
        self.loop_depth = saved_loop_depth;
        self.counters.lock().unwrap().pop_function();

        let mut status = result?;
        match status.flow {
            ControlFlow::Return(code) => status = Status::code(code),
            // break/continue do not escape a function
            ControlFlow::Break(_) | ControlFlow::Continue(_) => {
                status = Status::code(status.code)
            }
            _ => {}
        }

        if capture {
            if let Some(code) = self.route_output(captured, redirects, out).await? {
                status.code = code;
            }
        }
        Ok(status)
    }

    /// Run a script found via PATH on a state clone with fresh positional
    /// parameters; state changes do not escape.
    async fn run_script_file(
        &mut self,
        name: &str,
        script: &str,
        args: &[String],
        redirects: &[Redirect],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        let parsed = match Parser::new(script).parse() {
            Ok(parsed) => parsed,
            Err(error) => {
                out.stderr.push_str(&format!("{}: {}\n", name, error));
                return Ok(Status::code(2));
            }
        };

        let mut sub = self.subshell_clone();
        sub.arg0 = name.to_string();
        sub.positional = vec![args.to_vec()];
        sub.locals = Vec::new();

        let capture = has_output_redirect(redirects);
        let mut captured = Output::default();
        let status = if capture {
            sub.run_commands(&parsed.commands, &mut captured, stdin).await?
        } else {
            sub.run_commands(&parsed.commands, out, stdin).await?
        };

        let mut status = Status::code(status.code);
        if capture {
            if let Some(code) = self.route_output(captured, redirects, out).await? {
                status.code = code;
            }
        }
        Ok(status)
    }

    /// Search `$PATH` in the virtual filesystem; a name containing `/` is
    /// resolved directly.
    async fn path_search(&self, name: &str) -> Result<Option<String>> {
        if name.contains('/') {
            let path = resolve_path(&self.cwd, name);
            if let Ok(meta) = self.fs.stat(&path).await {
                if meta.file_type.is_file() {
                    let bytes = self.fs.read_file(&path).await?;
                    return Ok(Some(String::from_utf8_lossy(&bytes).to_string()));
                }
            }
            return Ok(None);
        }

        let path_var = self.var_value("PATH");
        for dir in path_var.split(':').filter(|d| !d.is_empty()) {
            let candidate = resolve_path(Path::new("/"), &format!("{}/{}", dir, name));
            if let Ok(meta) = self.fs.stat(&candidate).await {
                if meta.file_type.is_file() {
                    let bytes = self.fs.read_file(&candidate).await?;
                    return Ok(Some(String::from_utf8_lossy(&bytes).to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Route a builtin's result through the command's redirections.
    async fn route_result(
        &mut self,
        result: ExecResult,
        redirects: &[Redirect],
        out: &mut Output,
    ) -> Result<Status> {
        let produced = Output {
            stdout: result.stdout,
            stderr: result.stderr,
        };
        let mut code = result.exit_code;
        if let Some(failed) = self.route_output(produced, redirects, out).await? {
            code = failed;
        }
        Ok(Status::code(code))
    }

    /// Collect stdin from input redirections, falling back to inherited
    /// (pipeline) stdin. A failed `<` is a per-command diagnostic, not an
    /// abort.
    async fn gather_stdin(
        &mut self,
        redirects: &[Redirect],
        inherited: Option<&str>,
        out: &mut Output,
    ) -> Result<std::result::Result<Option<String>, Status>> {
        let mut stdin = inherited.map(str::to_string);
        for redirect in redirects {
            match redirect.kind {
                RedirectKind::Input => {
                    let target = self.expand_word_single(&redirect.target, out).await?;
                    let path = resolve_path(&self.cwd, &target);
                    match self.fs.read_file(&path).await {
                        Ok(bytes) => {
                            stdin = Some(String::from_utf8_lossy(&bytes).to_string())
                        }
                        Err(error) => {
                            out.stderr
                                .push_str(&format!("vbash: {}: {}\n", target, error));
                            return Ok(Err(Status::code(1)));
                        }
                    }
                }
                RedirectKind::HereString => {
                    let word = self.expand_word_single(&redirect.target, out).await?;
                    stdin = Some(format!("{}\n", word));
                }
                RedirectKind::HereDoc => {
                    let body = self.expand_word_single(&redirect.target, out).await?;
                    stdin = Some(body);
                }
                _ => {}
            }
        }
        Ok(Ok(stdin))
    }

    /// Route produced output through the redirect list.
    ///
    /// Descriptors 1 and 2 start bound to the shell's stdout/stderr buffers.
    /// Redirects rebind them left to right, and a dup (`2>&1`) copies the
    /// *current* binding of its target descriptor, as in bash: `cmd > f 2>&1`
    /// sends both streams to the file, while `cmd 2>&1 > f` leaves stderr on
    /// the original stdout. Every file target named by a redirect is written
    /// (truncated or appended) even if a later redirect rebinds the
    /// descriptor away from it. Returns a failure exit code if a target
    /// could not be written.
    async fn route_output(
        &mut self,
        produced: Output,
        redirects: &[Redirect],
        out: &mut Output,
    ) -> Result<Option<i32>> {
        let mut files: Vec<(PathBuf, String, bool)> = Vec::new();
        let mut fd1 = RouteDest::Stdout;
        let mut fd2 = RouteDest::Stderr;

        for redirect in redirects {
            match redirect.kind {
                RedirectKind::Output | RedirectKind::Append => {
                    let target = self.expand_word_single(&redirect.target, out).await?;
                    let path = resolve_path(&self.cwd, &target);
                    files.push((path, target, redirect.kind == RedirectKind::Append));
                    let dest = RouteDest::File(files.len() - 1);
                    match redirect.fd {
                        Some(2) => fd2 = dest,
                        _ => fd1 = dest,
                    }
                }
                RedirectKind::OutputBoth => {
                    let target = self.expand_word_single(&redirect.target, out).await?;
                    let path = resolve_path(&self.cwd, &target);
                    files.push((path, target, false));
                    let dest = RouteDest::File(files.len() - 1);
                    fd1 = dest;
                    fd2 = dest;
                }
                RedirectKind::DupOutput => {
                    let target = self.expand_word_single(&redirect.target, out).await?;
                    match (redirect.fd, target.as_str()) {
                        (Some(2), "1") => fd2 = fd1,
                        (Some(1) | None, "2") => fd1 = fd2,
                        _ => {}
                    }
                }
                RedirectKind::Input | RedirectKind::HereDoc | RedirectKind::HereString => {}
            }
        }

        let mut failed = None;
        for (index, (path, display, append)) in files.iter().enumerate() {
            let mut data = String::new();
            if fd1 == RouteDest::File(index) {
                data.push_str(&produced.stdout);
            }
            if fd2 == RouteDest::File(index) {
                data.push_str(&produced.stderr);
            }
            let write = if *append {
                self.fs.append_file(path, data.as_bytes()).await
            } else {
                self.fs.write_file(path, data.as_bytes()).await
            };
            if let Err(error) = write {
                out.stderr
                    .push_str(&format!("vbash: {}: {}\n", display, error));
                failed = Some(1);
            }
        }

        match fd1 {
            RouteDest::Stdout => out.stdout.push_str(&produced.stdout),
            RouteDest::Stderr => out.stderr.push_str(&produced.stdout),
            RouteDest::File(_) => {}
        }
        match fd2 {
            RouteDest::Stdout => out.stdout.push_str(&produced.stderr),
            RouteDest::Stderr => out.stderr.push_str(&produced.stderr),
            RouteDest::File(_) => {}
        }

        Ok(failed)
    }

    /// Clone the mutable state for a subshell, command substitution or
    /// `-exec` re-entry. The filesystem, registry and budget counters are
    /// shared.
    pub(crate) fn subshell_clone(&self) -> Interpreter {
        Interpreter {
            fs: Arc::clone(&self.fs),
            registry: Arc::clone(&self.registry),
            variables: self.variables.clone(),
            functions: self.functions.clone(),
            cwd: self.cwd.clone(),
            arg0: self.arg0.clone(),
            last_exit_code: self.last_exit_code,
            positional: self.positional.clone(),
            locals: self.locals.clone(),
            // A clone is a fresh execution environment: `break` inside a
            // subshell or substitution does not see the caller's loops
            loop_depth: 0,
            limits: self.limits.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Run a pre-expanded argv through the normal dispatch chain. Used by
    /// the injected runner for `find -exec` and `xargs`.
    pub(crate) async fn run_argv(
        &mut self,
        argv: &[String],
        out: &mut Output,
        stdin: Option<&str>,
    ) -> Result<Status> {
        self.counters
            .lock()
            .unwrap()
            .tick_command(&self.limits)?;
        let status = self.dispatch(argv, &[], out, stdin).await?;
        self.last_exit_code = status.code;
        Ok(status)
    }

    // --- state accessors used across the interpreter modules ---

    /// Resolve a variable or special parameter to its string value. Unset
    /// variables are the empty string.
    pub(crate) fn var_value(&self, name: &str) -> String {
        match name {
            "?" => self.last_exit_code.to_string(),
            "#" => self.positionals().len().to_string(),
            "@" | "*" => self.positionals().join(" "),
            "0" => self.arg0.clone(),
            "$" => "1".to_string(),
            "!" | "-" => String::new(),
            _ if name.len() == 1 && name.as_bytes()[0].is_ascii_digit() => {
                let index: usize = name.parse().unwrap_or(0);
                index
                    .checked_sub(1)
                    .and_then(|i| self.positionals().get(i))
                    .cloned()
                    .unwrap_or_default()
            }
            _ => self
                .variables
                .get(name)
                .map(|v| v.value.clone())
                .unwrap_or_default(),
        }
    }

    /// Set a variable, preserving an existing export flag. A name shadowed
    /// by `local` updates the shadowing entry; the saved outer value is
    /// restored when the function returns.
    pub(crate) fn set_var(&mut self, name: &str, value: &str) {
        match self.variables.get_mut(name) {
            Some(variable) => variable.value = value.to_string(),
            None => {
                self.variables
                    .insert(name.to_string(), Variable::new(value));
            }
        }
    }

    pub(crate) fn set_last_exit_code(&mut self, code: i32) {
        self.last_exit_code = code;
    }

    pub(crate) fn positionals(&self) -> &[String] {
        self.positional.last().map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn ifs(&self) -> String {
        self.variables
            .get("IFS")
            .map(|v| v.value.clone())
            .unwrap_or_else(|| " \t\n".to_string())
    }

    /// Snapshot of all variables as plain strings, for builtin contexts.
    fn env_snapshot(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

/// Inside a loop, exceeding the command budget reads as an iteration
/// problem; report it as such.
fn in_loop_context(error: Error) -> Error {
    match error {
        Error::Limit(LimitExceeded::MaxCommands) => {
            Error::Limit(LimitExceeded::MaxLoopIterations)
        }
        other => other,
    }
}

/// Where a file descriptor currently points during redirect routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteDest {
    /// The shell's stdout buffer
    Stdout,
    /// The shell's stderr buffer
    Stderr,
    /// The nth file target opened by the redirect list
    File(usize),
}

fn has_output_redirect(redirects: &[Redirect]) -> bool {
    redirects.iter().any(|r| {
        matches!(
            r.kind,
            RedirectKind::Output
                | RedirectKind::Append
                | RedirectKind::OutputBoth
                | RedirectKind::DupOutput
        )
    })
}

/// Runner handed to registry builtins so `find -exec` and `xargs` can invoke
/// commands through the shell's own dispatch, on a state clone that shares
/// the execution budget.
pub(crate) struct StateRunner {
    inner: AsyncMutex<Interpreter>,
}

impl StateRunner {
    pub(crate) fn new(interpreter: Interpreter) -> Self {
        Self {
            inner: AsyncMutex::new(interpreter),
        }
    }
}

#[async_trait]
impl CommandRunner for StateRunner {
    async fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<ExecResult> {
        if argv.is_empty() {
            return Ok(ExecResult::ok(""));
        }
        let mut interpreter = self.inner.lock().await;
        let mut out = Output::default();
        let status = interpreter.run_argv(argv, &mut out, stdin).await?;
        Ok(ExecResult {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code: status.code,
        })
    }
}
