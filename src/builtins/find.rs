//! find builtin command
//!
//! `find <path>... [expression]` with a dedicated recursive-descent parser
//! for the predicate language. Precedence, tightest first: `!`/`-not`,
//! conjunction (implicit adjacency or `-a`/`-and`), then `-o`/`-or`;
//! parentheses group (they arrive as the literal words `(` and `)` produced
//! by `\(` `\)`). Evaluation short-circuits: `-a` skips the right side on a
//! false left, `-o` on a true left.
//!
//! Traversal is a pre-order DFS with lexicographically sorted children.
//! `-exec cmd args \;` substitutes `{}` with the current path and runs the
//! command through the shell's injected runner; its exit status is the
//! predicate's truth value.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::{resolve_path, Builtin, Context};
use crate::error::Result;
use crate::fs::Metadata;
use crate::interpreter::glob::glob_match;
use crate::interpreter::ExecResult;

/// The find builtin - search the file tree.
///
/// Usage: find [PATH...] [EXPRESSION]
///
/// Predicates:
///   -name PATTERN    Glob match against the basename
///   -type f|d        Regular file / directory
///   -maxdepth N      Descend at most N levels (the start path is depth 0)
///   -exec CMD... \;  Run CMD with {} replaced by the current path
///   -print           Print matching paths (the default action)
///
/// Operators: \( \) grouping, ! / -not, -a / -and (implicit), -o / -or.
///
/// Exit status: 0 on success, 1 when a path is missing or a predicate is
/// unknown, 2 on expression syntax errors.
pub struct Find;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    /// Implicit truth when no predicates are given
    True,
    Name(String),
    Type(FindType),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Exec(Vec<String>),
    Print,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FindType {
    File,
    Directory,
}

#[derive(Debug, Default, Clone)]
struct FindOptions {
    max_depth: Option<usize>,
}

#[derive(Debug)]
struct FindError {
    message: String,
    code: i32,
}

impl FindError {
    fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Accumulated walk results.
#[derive(Default)]
struct FindState {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

const FIND_USAGE: &str = "\
Usage: find [PATH...] [EXPRESSION]

Predicates:
  -name PATTERN    glob match against the basename
  -type f|d        regular file / directory
  -maxdepth N      descend at most N levels
  -exec CMD... \\;  run CMD with {} replaced by the current path
  -print           print matching paths (the default action)

Operators: \\( \\) grouping, ! / -not, -a / -and (implicit), -o / -or
";

#[async_trait]
impl Builtin for Find {
    async fn execute(&self, ctx: Context<'_>) -> Result<ExecResult> {
        if ctx.args.iter().any(|a| a == "--help") {
            return Ok(ExecResult::ok(FIND_USAGE));
        }

        // Paths come first; the expression starts at the first operator or
        // predicate token
        let mut paths: Vec<&str> = Vec::new();
        let mut split = ctx.args.len();
        for (i, arg) in ctx.args.iter().enumerate() {
            if arg == "!" || arg == "(" || arg.starts_with('-') {
                split = i;
                break;
            }
            paths.push(arg);
        }
        if paths.is_empty() {
            paths.push(".");
        }

        let (expr, options) = match parse_expression(&ctx.args[split..]) {
            Ok(parsed) => parsed,
            Err(error) => {
                return Ok(ExecResult::err(format!("{}\n", error.message), error.code))
            }
        };
        // An explicit action (-exec, -print) replaces the default print
        let suppress_print = has_action(&expr);

        let mut state = FindState::default();
        for path_str in paths {
            let path = resolve_path(ctx.cwd, path_str);
            if !ctx.fs.exists(&path).await.unwrap_or(false) {
                state.stderr.push_str(&format!(
                    "find: {}: No such file or directory\n",
                    path_str
                ));
                state.exit_code = 1;
                continue;
            }
            walk(
                path,
                path_str.to_string(),
                0,
                &expr,
                &options,
                suppress_print,
                &ctx,
                &mut state,
            )
            .await?;
        }

        Ok(ExecResult {
            stdout: state.stdout,
            stderr: state.stderr,
            exit_code: state.exit_code,
        })
    }
}

/// Pre-order DFS with lexicographically sorted children.
#[allow(clippy::too_many_arguments)]
fn walk<'a>(
    path: PathBuf,
    display: String,
    depth: usize,
    expr: &'a Expr,
    options: &'a FindOptions,
    suppress_print: bool,
    ctx: &'a Context<'a>,
    state: &'a mut FindState,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let meta = match ctx.fs.stat(&path).await {
            Ok(meta) => meta,
            Err(_) => return Ok(()),
        };

        let name = Path::new(&display)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.clone());

        if eval_expr(expr, &name, &display, &meta, ctx, state).await? && !suppress_print {
            state.stdout.push_str(&display);
            state.stdout.push('\n');
        }

        if meta.file_type.is_dir() {
            if let Some(max) = options.max_depth {
                if depth >= max {
                    return Ok(());
                }
            }
            let mut entries = ctx.fs.read_dir(&path).await?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let child_path = path.join(&entry.name);
                let child_display = format!("{}/{}", display, entry.name);
                walk(
                    child_path,
                    child_display,
                    depth + 1,
                    expr,
                    options,
                    suppress_print,
                    ctx,
                    state,
                )
                .await?;
            }
        }
        Ok(())
    })
}

/// Evaluate the expression at one node, short-circuiting.
fn eval_expr<'a>(
    expr: &'a Expr,
    name: &'a str,
    display: &'a str,
    meta: &'a Metadata,
    ctx: &'a Context<'a>,
    state: &'a mut FindState,
) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
    Box::pin(async move {
        match expr {
            Expr::True => Ok(true),
            Expr::Print => {
                state.stdout.push_str(display);
                state.stdout.push('\n');
                Ok(true)
            }
            Expr::Name(pattern) => Ok(glob_match(pattern, name)),
            Expr::Type(FindType::File) => Ok(meta.file_type.is_file()),
            Expr::Type(FindType::Directory) => Ok(meta.file_type.is_dir()),
            Expr::Not(inner) => Ok(!eval_expr(inner, name, display, meta, ctx, state).await?),
            Expr::And(left, right) => {
                if !eval_expr(left, name, display, meta, ctx, state).await? {
                    return Ok(false);
                }
                eval_expr(right, name, display, meta, ctx, state).await
            }
            Expr::Or(left, right) => {
                if eval_expr(left, name, display, meta, ctx, state).await? {
                    return Ok(true);
                }
                eval_expr(right, name, display, meta, ctx, state).await
            }
            Expr::Exec(template) => {
                let runner = match ctx.exec {
                    Some(runner) => runner,
                    None => {
                        state
                            .stderr
                            .push_str("find: -exec: command execution unavailable\n");
                        state.exit_code = 1;
                        return Ok(false);
                    }
                };
                let argv: Vec<String> =
                    template.iter().map(|arg| arg.replace("{}", display)).collect();
                let result = runner.run(&argv, None).await?;
                state.stdout.push_str(&result.stdout);
                state.stderr.push_str(&result.stderr);
                // POSIX: the command's exit status is the predicate's value
                Ok(result.exit_code == 0)
            }
        }
    })
}

fn has_action(expr: &Expr) -> bool {
    match expr {
        Expr::Exec(_) | Expr::Print => true,
        Expr::Not(inner) => has_action(inner),
        Expr::And(a, b) | Expr::Or(a, b) => has_action(a) || has_action(b),
        _ => false,
    }
}

fn parse_expression(tokens: &[String]) -> std::result::Result<(Expr, FindOptions), FindError> {
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        options: FindOptions::default(),
    };
    if tokens.is_empty() {
        return Ok((Expr::True, parser.options));
    }
    let expr = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(FindError::new(
            format!(
                "find: syntax error near '{}'",
                parser.tokens[parser.pos]
            ),
            2,
        ));
    }
    Ok((expr, parser.options))
}

struct ExprParser<'a> {
    tokens: &'a [String],
    pos: usize,
    options: FindOptions,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.pos).map(|s| s.as_str());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn operand(&mut self, predicate: &str) -> std::result::Result<String, FindError> {
        match self.tokens.get(self.pos) {
            Some(value) => {
                self.pos += 1;
                Ok(value.clone())
            }
            None => Err(FindError::new(
                format!("find: missing argument to '{}'", predicate),
                2,
            )),
        }
    }

    fn parse_or(&mut self) -> std::result::Result<Expr, FindError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some("-o") | Some("-or")) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> std::result::Result<Expr, FindError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                None | Some(")") | Some("-o") | Some("-or") => break,
                Some("-a") | Some("-and") => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    left = Expr::And(Box::new(left), Box::new(right));
                }
                // Adjacent predicates conjoin implicitly
                Some(_) => {
                    let right = self.parse_unary()?;
                    left = Expr::And(Box::new(left), Box::new(right));
                }
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> std::result::Result<Expr, FindError> {
        if matches!(self.peek(), Some("!") | Some("-not")) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> std::result::Result<Expr, FindError> {
        let token = match self.next() {
            Some(token) => token.to_string(),
            None => {
                return Err(FindError::new(
                    "find: expected expression".to_string(),
                    2,
                ))
            }
        };

        match token.as_str() {
            "(" => {
                let expr = self.parse_or()?;
                match self.next() {
                    Some(")") => Ok(expr),
                    _ => Err(FindError::new("find: missing ')'", 2)),
                }
            }
            "-name" => Ok(Expr::Name(self.operand("-name")?)),
            "-type" => {
                let value = self.operand("-type")?;
                match value.as_str() {
                    "f" => Ok(Expr::Type(FindType::File)),
                    "d" => Ok(Expr::Type(FindType::Directory)),
                    other => Err(FindError::new(
                        format!("find: Unknown argument to -type: {}", other),
                        1,
                    )),
                }
            }
            "-maxdepth" => {
                let value = self.operand("-maxdepth")?;
                match value.parse() {
                    Ok(n) => {
                        self.options.max_depth = Some(n);
                        Ok(Expr::True)
                    }
                    Err(_) => Err(FindError::new(
                        format!("find: invalid argument to -maxdepth: {}", value),
                        2,
                    )),
                }
            }
            "-print" => Ok(Expr::Print),
            "-exec" => {
                let mut argv = Vec::new();
                loop {
                    match self.next() {
                        Some(";") => break,
                        Some(arg) => argv.push(arg.to_string()),
                        None => {
                            return Err(FindError::new(
                                "find: missing argument to '-exec'",
                                2,
                            ))
                        }
                    }
                }
                Ok(Expr::Exec(argv))
            }
            other => Err(FindError::new(
                format!("find: unknown predicate '{}'", other),
                1,
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn toks(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_expression_is_true() {
        let (expr, options) = parse_expression(&toks(&[])).unwrap();
        assert_eq!(expr, Expr::True);
        assert_eq!(options.max_depth, None);
    }

    #[test]
    fn implicit_and_binds_adjacent_predicates() {
        let (expr, _) = parse_expression(&toks(&["-name", "*.ts", "-type", "f"])).unwrap();
        assert_eq!(
            expr,
            Expr::And(
                Box::new(Expr::Name("*.ts".to_string())),
                Box::new(Expr::Type(FindType::File)),
            )
        );
    }

    #[test]
    fn or_binds_looser_than_and() {
        // a -o b c  parses as  a -o (b AND c)
        let (expr, _) = parse_expression(&toks(&[
            "-name", "a", "-o", "-name", "b", "-type", "d",
        ]))
        .unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::Name("a".to_string())),
                Box::new(Expr::And(
                    Box::new(Expr::Name("b".to_string())),
                    Box::new(Expr::Type(FindType::Directory)),
                )),
            )
        );
    }

    #[test]
    fn not_binds_tightest() {
        let (expr, _) = parse_expression(&toks(&["!", "-name", "x", "-type", "f"])).unwrap();
        assert_eq!(
            expr,
            Expr::And(
                Box::new(Expr::Not(Box::new(Expr::Name("x".to_string())))),
                Box::new(Expr::Type(FindType::File)),
            )
        );
    }

    #[test]
    fn parens_override_precedence() {
        let (expr, _) = parse_expression(&toks(&[
            "-type", "f", "(", "-name", "*.md", "-o", "-name", "*.json", ")",
        ]))
        .unwrap();
        match expr {
            Expr::And(left, right) => {
                assert_eq!(*left, Expr::Type(FindType::File));
                assert!(matches!(*right, Expr::Or(_, _)));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn maxdepth_is_an_option_not_a_predicate() {
        let (expr, options) = parse_expression(&toks(&["-maxdepth", "2"])).unwrap();
        assert_eq!(expr, Expr::True);
        assert_eq!(options.max_depth, Some(2));
    }

    #[test]
    fn exec_collects_until_semicolon() {
        let (expr, _) = parse_expression(&toks(&["-exec", "cat", "{}", ";"])).unwrap();
        assert_eq!(
            expr,
            Expr::Exec(vec!["cat".to_string(), "{}".to_string()])
        );
        assert!(has_action(&expr));
    }

    #[test]
    fn exec_without_terminator_is_syntax_error() {
        let err = parse_expression(&toks(&["-exec", "cat", "{}"])).unwrap_err();
        assert_eq!(err.code, 2);
        assert!(err.message.contains("-exec"));
    }

    #[test]
    fn unknown_predicate_is_code_one() {
        let err = parse_expression(&toks(&["-frobnicate"])).unwrap_err();
        assert_eq!(err.code, 1);
        assert_eq!(err.message, "find: unknown predicate '-frobnicate'");
    }

    #[test]
    fn bad_type_argument() {
        let err = parse_expression(&toks(&["-type", "x"])).unwrap_err();
        assert_eq!(err.code, 1);
        assert_eq!(err.message, "find: Unknown argument to -type: x");
    }

    #[test]
    fn missing_operand_is_syntax_error() {
        let err = parse_expression(&toks(&["-name"])).unwrap_err();
        assert_eq!(err.code, 2);
    }

    #[test]
    fn missing_close_paren_is_syntax_error() {
        let err = parse_expression(&toks(&["(", "-name", "x"])).unwrap_err();
        assert_eq!(err.code, 2);
    }
}
