//! Parser module for vbash
//!
//! Implements a recursive descent parser over the POSIX shell grammar:
//! lists, pipelines, simple commands with leading assignments and
//! redirections, compound commands (`if`/`while`/`until`/`for`/`case`,
//! `(...)`, `{...}`), and function definitions.
//!
//! Precedence, lowest to highest: `;`/newline, `&&`/`||` (left-associative,
//! equal precedence), `|`, command.

mod ast;
mod lexer;
mod tokens;

pub use ast::*;
pub use lexer::Lexer;
pub use tokens::Token;

pub(crate) use lexer::scan_text_parts;

use crate::error::{Error, Result};
use tokens::token_text;

/// Parser for shell scripts.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    /// Byte offset of `current` in the source, for function source capture
    current_start: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            current: None,
            current_start: 0,
        }
    }

    /// Parse the input and return the AST.
    pub fn parse(mut self) -> Result<Script> {
        self.advance()?;
        let commands = self.parse_commands_until(&[])?;
        if self.current.is_some() {
            return Err(self.unexpected());
        }
        Ok(Script { commands })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        self.current_start = self.lexer.token_start();
        Ok(())
    }

    fn skip_newlines(&mut self) -> Result<()> {
        while matches!(self.current, Some(Token::Newline)) {
            self.advance()?;
        }
        Ok(())
    }

    fn unexpected(&self) -> Error {
        match &self.current {
            Some(tok) => Error::Parse(format!(
                "syntax error near unexpected token '{}'",
                token_text(tok)
            )),
            None => lexer::unexpected_end(),
        }
    }

    /// Bare keyword at the current token, if any.
    fn current_keyword(&self) -> Option<&str> {
        match &self.current {
            Some(Token::Word(w)) => w.as_bare_literal(),
            _ => None,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.current_keyword() == Some(keyword) {
            self.advance()
        } else {
            Err(self.unexpected())
        }
    }

    /// True when the current token ends a command list inside a compound
    /// construct.
    fn at_terminator(&self, stops: &[&str]) -> bool {
        match &self.current {
            None => true,
            Some(Token::RightParen) | Some(Token::RightBrace) | Some(Token::DSemi) => true,
            Some(Token::Word(w)) => w
                .as_bare_literal()
                .map(|s| stops.contains(&s))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Parse commands separated by `;`, `&` and newlines until a terminator.
    fn parse_commands_until(&mut self, stops: &[&str]) -> Result<Vec<Command>> {
        let mut commands = Vec::new();
        loop {
            while matches!(
                self.current,
                Some(Token::Newline) | Some(Token::Semicolon) | Some(Token::Background)
            ) {
                self.advance()?;
            }
            if self.at_terminator(stops) {
                break;
            }
            commands.push(self.parse_list(stops)?);
        }
        Ok(commands)
    }

    /// Parse a `;`/`&`-joined list of and-or chains.
    fn parse_list(&mut self, stops: &[&str]) -> Result<Command> {
        let first = self.parse_and_or(stops)?;
        let mut rest = Vec::new();

        loop {
            let op = match self.current {
                Some(Token::Semicolon) => ListOperator::Semicolon,
                Some(Token::Background) => ListOperator::Background,
                _ => break,
            };
            self.advance()?;
            if matches!(self.current, Some(Token::Newline) | None) || self.at_terminator(stops) {
                // Trailing separator
                break;
            }
            rest.push((op, self.parse_and_or(stops)?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Command::List(CommandList {
                first: Box::new(first),
                rest,
            }))
        }
    }

    /// Parse pipelines joined by `&&` / `||`.
    fn parse_and_or(&mut self, stops: &[&str]) -> Result<Command> {
        let first = self.parse_pipeline(stops)?;
        let mut rest = Vec::new();

        loop {
            let op = match self.current {
                Some(Token::And) => ListOperator::And,
                Some(Token::Or) => ListOperator::Or,
                _ => break,
            };
            self.advance()?;
            self.skip_newlines()?;
            rest.push((op, self.parse_pipeline(stops)?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Command::List(CommandList {
                first: Box::new(first),
                rest,
            }))
        }
    }

    /// Parse a (possibly negated, possibly single-command) pipeline.
    fn parse_pipeline(&mut self, stops: &[&str]) -> Result<Command> {
        let mut negated = false;
        if self.current_keyword() == Some("!") {
            negated = true;
            self.advance()?;
        }

        let mut commands = vec![self.parse_command(stops)?];
        while matches!(self.current, Some(Token::Pipe)) {
            self.advance()?;
            self.skip_newlines()?;
            commands.push(self.parse_command(stops)?);
        }

        if !negated && commands.len() == 1 {
            Ok(commands.remove(0))
        } else {
            Ok(Command::Pipeline(Pipeline { negated, commands }))
        }
    }

    /// Parse one command: compound, function definition, or simple.
    fn parse_command(&mut self, stops: &[&str]) -> Result<Command> {
        match &self.current {
            None => Err(lexer::unexpected_end()),
            Some(Token::LeftParen) => {
                self.advance()?;
                let body = self.parse_commands_until(&[])?;
                match self.current {
                    Some(Token::RightParen) => self.advance()?,
                    _ => return Err(self.unexpected()),
                }
                let redirects = self.parse_redirect_list()?;
                Ok(Command::Compound(CompoundCommand::Subshell(body), redirects))
            }
            Some(Token::LeftBrace) => {
                self.advance()?;
                let body = self.parse_commands_until(&[])?;
                match self.current {
                    Some(Token::RightBrace) => self.advance()?,
                    _ => return Err(self.unexpected()),
                }
                let redirects = self.parse_redirect_list()?;
                Ok(Command::Compound(
                    CompoundCommand::BraceGroup(body),
                    redirects,
                ))
            }
            Some(Token::Word(_)) => {
                match self.current_keyword() {
                    Some("if") => return self.parse_if(),
                    Some("while") => return self.parse_while(),
                    Some("until") => return self.parse_until(),
                    Some("for") => return self.parse_for(),
                    Some("case") => return self.parse_case(),
                    _ => {}
                }
                if let Some(def) = self.try_parse_function()? {
                    return Ok(Command::Function(def));
                }
                Ok(Command::Simple(self.parse_simple(stops)?))
            }
            Some(Token::Redirect { .. }) | Some(Token::RedirectDup { .. }) => {
                Ok(Command::Simple(self.parse_simple(stops)?))
            }
            Some(_) => Err(self.unexpected()),
        }
    }

    /// Parse `name() compound` if the lookahead matches, capturing the body's
    /// source text for diagnostics.
    fn try_parse_function(&mut self) -> Result<Option<FunctionDef>> {
        let name = match self.current_keyword() {
            Some(s) if is_identifier(s) => s.to_string(),
            _ => return Ok(None),
        };

        // One-token lookahead via a lexer clone: only `name(` starts a
        // function definition
        let mut peek = self.lexer.clone();
        if !matches!(peek.next_token()?, Some(Token::LeftParen)) {
            return Ok(None);
        }

        self.advance()?; // name
        self.advance()?; // (
        match self.current {
            Some(Token::RightParen) => self.advance()?,
            _ => return Err(self.unexpected()),
        }
        self.skip_newlines()?;

        let body_start = self.current_start;
        let body = self.parse_command(&[])?;
        let body_end = self.current_start.min(self.lexer.source().len());
        let source = self.lexer.source()[body_start..body_end].trim_end().to_string();

        Ok(Some(FunctionDef {
            name,
            body: Box::new(body),
            source,
        }))
    }

    /// Parse a simple command: assignments, words, redirections interleaved.
    fn parse_simple(&mut self, _stops: &[&str]) -> Result<SimpleCommand> {
        let mut assignments = Vec::new();
        let mut words: Vec<Word> = Vec::new();
        let mut redirects = Vec::new();

        loop {
            match &self.current {
                Some(Token::Word(w)) => {
                    let w = w.clone();
                    if words.is_empty() {
                        if let Some(assignment) = split_assignment(&w) {
                            assignments.push(assignment);
                            self.advance()?;
                            continue;
                        }
                    }
                    words.push(w);
                    self.advance()?;
                }
                Some(Token::Redirect { .. }) | Some(Token::RedirectDup { .. }) => {
                    redirects.push(self.parse_one_redirect()?);
                }
                _ => break,
            }
        }

        if assignments.is_empty() && words.is_empty() && redirects.is_empty() {
            return Err(self.unexpected());
        }

        Ok(SimpleCommand {
            assignments,
            words,
            redirects,
        })
    }

    /// Parse a single redirection (the current token must be a redirect).
    fn parse_one_redirect(&mut self) -> Result<Redirect> {
        match self.current.clone() {
            Some(Token::RedirectDup { fd, target }) => {
                self.advance()?;
                Ok(Redirect {
                    fd: Some(fd),
                    kind: RedirectKind::DupOutput,
                    target: Word::literal(target.to_string()),
                })
            }
            Some(Token::Redirect { fd, kind }) => {
                self.advance()?;
                let word = match &self.current {
                    Some(Token::Word(w)) => w.clone(),
                    _ => return Err(self.unexpected()),
                };
                if kind == RedirectKind::HereDoc {
                    // The delimiter decides whether the body is expanded:
                    // any quoting on it suppresses expansion
                    let delimiter = word.to_string();
                    let quoted = !word
                        .parts
                        .iter()
                        .all(|p| matches!(p, WordPart::Literal(_)));
                    let body = self.lexer.read_heredoc(&delimiter)?;
                    self.advance()?;
                    let target = if quoted {
                        Word {
                            parts: vec![WordPart::SingleQuoted(body)],
                        }
                    } else {
                        Word {
                            parts: vec![WordPart::DoubleQuoted(scan_text_parts(&body)?)],
                        }
                    };
                    Ok(Redirect {
                        fd,
                        kind,
                        target,
                    })
                } else {
                    self.advance()?;
                    Ok(Redirect {
                        fd,
                        kind,
                        target: word,
                    })
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse trailing redirections after a compound command.
    fn parse_redirect_list(&mut self) -> Result<Vec<Redirect>> {
        let mut redirects = Vec::new();
        while matches!(
            self.current,
            Some(Token::Redirect { .. }) | Some(Token::RedirectDup { .. })
        ) {
            redirects.push(self.parse_one_redirect()?);
        }
        Ok(redirects)
    }

    fn parse_if(&mut self) -> Result<Command> {
        self.advance()?; // if
        let condition = self.parse_commands_until(&["then"])?;
        self.expect_keyword("then")?;
        let then_branch = self.parse_commands_until(&["elif", "else", "fi"])?;

        let mut elif_branches = Vec::new();
        while self.current_keyword() == Some("elif") {
            self.advance()?;
            let cond = self.parse_commands_until(&["then"])?;
            self.expect_keyword("then")?;
            let body = self.parse_commands_until(&["elif", "else", "fi"])?;
            elif_branches.push((cond, body));
        }

        let else_branch = if self.current_keyword() == Some("else") {
            self.advance()?;
            Some(self.parse_commands_until(&["fi"])?)
        } else {
            None
        };

        self.expect_keyword("fi")?;
        let redirects = self.parse_redirect_list()?;
        Ok(Command::Compound(
            CompoundCommand::If(IfCommand {
                condition,
                then_branch,
                elif_branches,
                else_branch,
            }),
            redirects,
        ))
    }

    fn parse_while(&mut self) -> Result<Command> {
        self.advance()?; // while
        let condition = self.parse_commands_until(&["do"])?;
        self.expect_keyword("do")?;
        let body = self.parse_commands_until(&["done"])?;
        self.expect_keyword("done")?;
        let redirects = self.parse_redirect_list()?;
        Ok(Command::Compound(
            CompoundCommand::While(WhileCommand { condition, body }),
            redirects,
        ))
    }

    fn parse_until(&mut self) -> Result<Command> {
        self.advance()?; // until
        let condition = self.parse_commands_until(&["do"])?;
        self.expect_keyword("do")?;
        let body = self.parse_commands_until(&["done"])?;
        self.expect_keyword("done")?;
        let redirects = self.parse_redirect_list()?;
        Ok(Command::Compound(
            CompoundCommand::Until(UntilCommand { condition, body }),
            redirects,
        ))
    }

    fn parse_for(&mut self) -> Result<Command> {
        self.advance()?; // for
        let variable = match self.current_keyword() {
            Some(s) if is_identifier(s) => s.to_string(),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;

        let words = if self.current_keyword() == Some("in") {
            self.advance()?;
            let mut list = Vec::new();
            while let Some(Token::Word(w)) = &self.current {
                list.push(w.clone());
                self.advance()?;
            }
            Some(list)
        } else {
            // `for v; do ...` iterates the positional parameters
            None
        };

        while matches!(
            self.current,
            Some(Token::Semicolon) | Some(Token::Newline)
        ) {
            self.advance()?;
        }
        self.expect_keyword("do")?;
        let body = self.parse_commands_until(&["done"])?;
        self.expect_keyword("done")?;
        let redirects = self.parse_redirect_list()?;
        Ok(Command::Compound(
            CompoundCommand::For(ForCommand {
                variable,
                words,
                body,
            }),
            redirects,
        ))
    }

    fn parse_case(&mut self) -> Result<Command> {
        self.advance()?; // case
        let subject = match &self.current {
            Some(Token::Word(w)) => w.clone(),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        self.skip_newlines()?;
        self.expect_keyword("in")?;

        let mut items = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.current_keyword() == Some("esac") {
                self.advance()?;
                break;
            }
            if self.current.is_none() {
                return Err(lexer::unexpected_end());
            }

            // Optional leading ( before the pattern list
            if matches!(self.current, Some(Token::LeftParen)) {
                self.advance()?;
            }

            let mut patterns = Vec::new();
            loop {
                match &self.current {
                    Some(Token::Word(w)) => {
                        patterns.push(w.clone());
                        self.advance()?;
                    }
                    _ => return Err(self.unexpected()),
                }
                if matches!(self.current, Some(Token::Pipe)) {
                    self.advance()?;
                } else {
                    break;
                }
            }
            match self.current {
                Some(Token::RightParen) => self.advance()?,
                _ => return Err(self.unexpected()),
            }

            let commands = self.parse_commands_until(&["esac"])?;
            if matches!(self.current, Some(Token::DSemi)) {
                self.advance()?;
            }
            items.push(CaseItem { patterns, commands });
        }

        let redirects = self.parse_redirect_list()?;
        Ok(Command::Compound(
            CompoundCommand::Case(CaseCommand { subject, items }),
            redirects,
        ))
    }
}

/// Check whether `s` is a valid shell identifier.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a word into `NAME=value` if its leading literal permits.
fn split_assignment(word: &Word) -> Option<Assignment> {
    let first = match word.parts.first() {
        Some(WordPart::Literal(s)) => s,
        _ => return None,
    };
    let eq = first.find('=')?;
    let name = &first[..eq];
    if !is_identifier(name) {
        return None;
    }

    let mut value_parts = Vec::new();
    let rest = &first[eq + 1..];
    if !rest.is_empty() {
        value_parts.push(WordPart::Literal(rest.to_string()));
    }
    value_parts.extend(word.parts[1..].iter().cloned());

    Some(Assignment {
        name: name.to_string(),
        value: Word { parts: value_parts },
    })
}
