//! AST types for parsed shell scripts

use std::fmt;

/// A complete parsed script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub commands: Vec<Command>,
}

/// A single command in the script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A simple command (e.g., `echo hello`)
    Simple(SimpleCommand),

    /// A pipeline (e.g., `ls | grep foo`)
    Pipeline(Pipeline),

    /// A command list (e.g., `a && b || c`)
    List(CommandList),

    /// A compound command (if, for, while, case, subshell, group) with its
    /// trailing redirections
    Compound(CompoundCommand, Vec<Redirect>),

    /// A function definition
    Function(FunctionDef),
}

/// A simple command: optional leading assignments, words, redirections.
///
/// The command name is not split from the arguments here; expansion decides
/// the final fields, and the first field becomes the name.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    /// Variable assignments before the command word
    pub assignments: Vec<Assignment>,
    /// Command name and arguments, pre-expansion
    pub words: Vec<Word>,
    /// Redirections
    pub redirects: Vec<Redirect>,
}

/// A pipeline of commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Whether the pipeline is negated (!)
    pub negated: bool,
    /// Commands in the pipeline, left to right
    pub commands: Vec<Command>,
}

/// A list of commands joined by operators.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandList {
    /// First command
    pub first: Box<Command>,
    /// Remaining commands with their operators
    pub rest: Vec<(ListOperator, Command)>,
}

/// Operators for command lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperator {
    /// && - execute next if previous succeeded
    And,
    /// || - execute next if previous failed
    Or,
    /// ; - execute next unconditionally
    Semicolon,
    /// & - no background jobs; behaves like ;
    Background,
}

/// Compound commands (control structures).
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommand {
    /// If statement
    If(IfCommand),
    /// For loop
    For(ForCommand),
    /// While loop
    While(WhileCommand),
    /// Until loop
    Until(UntilCommand),
    /// Case statement
    Case(CaseCommand),
    /// Subshell (commands in parentheses, run on a state clone)
    Subshell(Vec<Command>),
    /// Brace group (run in the current state)
    BraceGroup(Vec<Command>),
}

/// If statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfCommand {
    pub condition: Vec<Command>,
    pub then_branch: Vec<Command>,
    pub elif_branches: Vec<(Vec<Command>, Vec<Command>)>,
    pub else_branch: Option<Vec<Command>>,
}

/// For loop. `words: None` means iterate the positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ForCommand {
    pub variable: String,
    pub words: Option<Vec<Word>>,
    pub body: Vec<Command>,
}

/// While loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileCommand {
    pub condition: Vec<Command>,
    pub body: Vec<Command>,
}

/// Until loop.
#[derive(Debug, Clone, PartialEq)]
pub struct UntilCommand {
    pub condition: Vec<Command>,
    pub body: Vec<Command>,
}

/// Case statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseCommand {
    pub subject: Word,
    pub items: Vec<CaseItem>,
}

/// A single case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub commands: Vec<Command>,
}

/// Function definition. Registration only; the body runs when called.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Box<Command>,
    /// Source text of the body, kept for diagnostics
    pub source: String,
}

/// Variable assignment (`NAME=value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

/// A word: a sequence of parts with distinct quoting contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    /// Create a word with a single unquoted literal part.
    pub fn literal(s: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal(s.into())],
        }
    }

    /// The word's text if it is a single bare (unquoted) literal.
    ///
    /// Keywords and operators like `!` are only recognized in this form;
    /// `"if"` or `\!` never are.
    pub fn as_bare_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// Parts of a word.
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Unquoted literal text, subject to splitting and pathname expansion
    Literal(String),
    /// Single-quoted text: fully literal
    SingleQuoted(String),
    /// Double-quoted text: expansions active, no splitting or globbing
    DoubleQuoted(Vec<WordPart>),
    /// Variable expansion: `$name`, `${name}`, and the specials
    /// `$? $# $@ $* $! $$ $- $0`..`$9`
    Variable(String),
    /// Parameter expansion with an operator, e.g. `${name:-word}`
    Param(ParamExpansion),
    /// Length expansion `${#name}`
    Length(String),
    /// Command substitution `$(...)` or backticks; raw script text
    CommandSubst(String),
    /// Arithmetic expansion `$((...))`; raw expression text
    Arith(String),
}

// Display is used for diagnostics only ("unexpected token '<tok>'"); it
// renders an approximation of the original source.
impl fmt::Display for WordPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordPart::Literal(s) => write!(f, "{}", s),
            WordPart::SingleQuoted(s) => write!(f, "{}", s),
            WordPart::DoubleQuoted(parts) => {
                for p in parts {
                    write!(f, "{}", p)?;
                }
                Ok(())
            }
            WordPart::Variable(name) => write!(f, "${}", name),
            WordPart::Param(p) => write!(f, "${{{}{}...}}", p.name, p.op.symbol()),
            WordPart::Length(name) => write!(f, "${{#{}}}", name),
            WordPart::CommandSubst(text) => write!(f, "$({})", text),
            WordPart::Arith(text) => write!(f, "$(({}))", text),
        }
    }
}

/// Parameter expansion: `${name<op>word}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExpansion {
    pub name: String,
    pub op: ParamOp,
    pub word: Vec<WordPart>,
}

/// Parameter expansion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOp {
    /// `:-` use default if unset/empty
    UseDefault,
    /// `:=` assign default if unset/empty
    AssignDefault,
    /// `:+` use replacement if set
    UseReplacement,
    /// `#` remove prefix (shortest match)
    RemovePrefixShort,
    /// `##` remove prefix (longest match)
    RemovePrefixLong,
    /// `%` remove suffix (shortest match)
    RemoveSuffixShort,
    /// `%%` remove suffix (longest match)
    RemoveSuffixLong,
}

impl ParamOp {
    fn symbol(&self) -> &'static str {
        match self {
            ParamOp::UseDefault => ":-",
            ParamOp::AssignDefault => ":=",
            ParamOp::UseReplacement => ":+",
            ParamOp::RemovePrefixShort => "#",
            ParamOp::RemovePrefixLong => "##",
            ParamOp::RemoveSuffixShort => "%",
            ParamOp::RemoveSuffixLong => "%%",
        }
    }
}

/// I/O redirection.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    /// File descriptor (default: 1 for output, 0 for input)
    pub fd: Option<i32>,
    /// Type of redirection
    pub kind: RedirectKind,
    /// Target: a file path word, the here-string word, or the collected
    /// heredoc body
    pub target: Word,
}

/// Types of redirections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `>` - redirect output, truncating
    Output,
    /// `>>` - append output
    Append,
    /// `<` - redirect input
    Input,
    /// `<<` - here document
    HereDoc,
    /// `<<<` - here string
    HereString,
    /// `N>&M` - duplicate output fd
    DupOutput,
    /// `&>` - redirect both stdout and stderr
    OutputBoth,
}
