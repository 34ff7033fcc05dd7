//! Expansion engine
//!
//! Turns parsed words into final argument fields in the fixed order: brace
//! expansion, tilde, parameter/variable expansion, command substitution,
//! arithmetic, IFS word splitting, pathname (glob) expansion.
//!
//! Each field is tracked twice while it is built: as the literal `text` the
//! command will receive, and as a `pattern` where characters that came from
//! quoted context are backslash-escaped. The pattern form is what pathname
//! expansion and `case`/`${x#pat}` matching consume, so quoting reliably
//! disables globbing without a side table.

use std::future::Future;
use std::pin::Pin;

use super::arith::eval_arith;
use super::glob;
use super::state::Output;
use super::Interpreter;
use crate::error::Result;
use crate::fs::resolve_path;
use crate::parser::{ParamOp, Parser, Word, WordPart};

/// A fully expanded field: the argument text and its glob-pattern form.
#[derive(Debug, Clone, Default)]
pub(crate) struct Field {
    pub text: String,
    pub pattern: String,
}

/// Accumulates fields during expansion. With `split` disabled, field breaks
/// are ignored and everything lands in one field (redirect targets, case
/// subjects, assignment values).
struct FieldBuilder {
    fields: Vec<Field>,
    current: Field,
    /// Whether the current field has begun; quoted text begins a field even
    /// when empty, unquoted empty expansions do not
    started: bool,
    split: bool,
}

impl FieldBuilder {
    fn new(split: bool) -> Self {
        Self {
            fields: Vec::new(),
            current: Field::default(),
            started: false,
            split,
        }
    }

    fn push(&mut self, text: &str, quoted: bool) {
        if quoted {
            self.started = true;
            self.current.pattern.push_str(&glob::escape(text));
        } else {
            if !text.is_empty() {
                self.started = true;
            }
            self.current.pattern.push_str(text);
        }
        self.current.text.push_str(text);
    }

    fn break_field(&mut self) {
        if !self.split {
            return;
        }
        if self.started {
            self.fields.push(std::mem::take(&mut self.current));
            self.started = false;
        }
    }

    /// Push an unquoted expansion result, splitting it on `ifs`.
    fn push_split(&mut self, value: &str, ifs: &str) {
        if !self.split {
            self.push(value, false);
            return;
        }
        if value.is_empty() {
            return;
        }
        let is_sep = |c: char| ifs.contains(c);
        let mut need_break = value.starts_with(is_sep);
        for piece in value.split(is_sep) {
            if piece.is_empty() {
                continue;
            }
            if need_break {
                self.break_field();
            }
            self.push(piece, false);
            need_break = true;
        }
        if value.ends_with(is_sep) {
            self.break_field();
        }
    }

    fn finish(mut self) -> Vec<Field> {
        if self.started {
            self.fields.push(self.current);
        }
        self.fields
    }

    /// Collapse everything built so far into a single field.
    fn finish_single(mut self) -> Field {
        if self.started || !self.fields.is_empty() {
            self.fields.push(self.current);
        }
        let mut joined = Field::default();
        for (i, f) in self.fields.iter().enumerate() {
            if i > 0 {
                joined.text.push(' ');
                joined.pattern.push(' ');
            }
            joined.text.push_str(&f.text);
            joined.pattern.push_str(&f.pattern);
        }
        joined
    }
}

impl Interpreter {
    /// Expand a word list into final argument strings: brace, tilde,
    /// parameter, command and arithmetic expansion, IFS splitting, then
    /// pathname expansion.
    pub(crate) async fn expand_words(
        &mut self,
        words: &[Word],
        out: &mut Output,
    ) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for word in words {
            for braced in brace_expand(word) {
                let braced = self.tilde_expand(braced);
                let mut builder = FieldBuilder::new(true);
                self.expand_parts(&braced.parts, false, &mut builder, out)
                    .await?;
                for field in builder.finish() {
                    if glob::has_glob(&field.pattern) {
                        let matches = self.expand_pathname(&field.pattern).await?;
                        if matches.is_empty() {
                            // Non-matching patterns stay literal
                            args.push(field.text);
                        } else {
                            args.extend(matches);
                        }
                    } else {
                        args.push(field.text);
                    }
                }
            }
        }
        Ok(args)
    }

    /// Expand a word to a single string: no brace expansion, no splitting,
    /// no pathname expansion. Used for redirect targets, case subjects and
    /// assignment values.
    pub(crate) async fn expand_word_single(
        &mut self,
        word: &Word,
        out: &mut Output,
    ) -> Result<String> {
        let word = self.tilde_expand(word.clone());
        let mut builder = FieldBuilder::new(false);
        self.expand_parts(&word.parts, false, &mut builder, out)
            .await?;
        Ok(builder.finish_single().text)
    }

    /// Expand a word to a glob pattern (quoted segments escaped). Used for
    /// `case` patterns.
    pub(crate) async fn expand_word_pattern(
        &mut self,
        word: &Word,
        out: &mut Output,
    ) -> Result<String> {
        let mut builder = FieldBuilder::new(false);
        self.expand_parts(&word.parts, false, &mut builder, out)
            .await?;
        Ok(builder.finish_single().pattern)
    }

    /// A leading unquoted `~` or `~/...` becomes `$HOME`.
    fn tilde_expand(&self, mut word: Word) -> Word {
        if let Some(WordPart::Literal(first)) = word.parts.first_mut() {
            if first == "~" || first.starts_with("~/") {
                let home = self.var_value("HOME");
                *first = format!("{}{}", home, &first[1..]);
            }
        }
        word
    }

    /// Expand parts into the builder. `quoted` is true inside double quotes:
    /// no splitting, no glob activation.
    fn expand_parts<'a>(
        &'a mut self,
        parts: &'a [WordPart],
        quoted: bool,
        builder: &'a mut FieldBuilder,
        out: &'a mut Output,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let ifs = self.ifs();
            for part in parts {
                match part {
                    WordPart::Literal(s) => builder.push(s, quoted),
                    WordPart::SingleQuoted(s) => builder.push(s, true),
                    WordPart::DoubleQuoted(inner) => {
                        // "$@" produces one field per positional parameter
                        if let [WordPart::Variable(name)] = inner.as_slice() {
                            if name == "@" {
                                let positionals = self.positionals().to_vec();
                                for (i, p) in positionals.iter().enumerate() {
                                    if i > 0 {
                                        builder.break_field();
                                    }
                                    builder.push(p, true);
                                }
                                continue;
                            }
                        }
                        self.expand_parts(inner, true, builder, out).await?;
                    }
                    WordPart::Variable(name) => {
                        let value = self.var_value(name);
                        if quoted {
                            builder.push(&value, true);
                        } else {
                            builder.push_split(&value, &ifs);
                        }
                    }
                    WordPart::Param(param) => {
                        let value = self.expand_param(param, out).await?;
                        if quoted {
                            builder.push(&value, true);
                        } else {
                            builder.push_split(&value, &ifs);
                        }
                    }
                    WordPart::Length(name) => {
                        let len = self.var_value(name).chars().count();
                        builder.push(&len.to_string(), quoted);
                    }
                    WordPart::CommandSubst(text) => {
                        let captured = self.run_capture(text, out).await?;
                        if quoted {
                            builder.push(&captured, true);
                        } else {
                            builder.push_split(&captured, &ifs);
                        }
                    }
                    WordPart::Arith(text) => {
                        let value = self.eval_arith_expr(text)?;
                        builder.push(&value.to_string(), quoted);
                    }
                }
            }
            Ok(())
        })
    }

    /// Expand the operand of a parameter expansion to one field.
    async fn expand_operand(&mut self, parts: &[WordPart], out: &mut Output) -> Result<Field> {
        let mut builder = FieldBuilder::new(false);
        self.expand_parts(parts, false, &mut builder, out).await?;
        Ok(builder.finish_single())
    }

    async fn expand_param(
        &mut self,
        param: &crate::parser::ParamExpansion,
        out: &mut Output,
    ) -> Result<String> {
        let value = self.var_value(&param.name);
        match param.op {
            ParamOp::UseDefault => {
                if value.is_empty() {
                    Ok(self.expand_operand(&param.word, out).await?.text)
                } else {
                    Ok(value)
                }
            }
            ParamOp::AssignDefault => {
                if value.is_empty() {
                    let default = self.expand_operand(&param.word, out).await?.text;
                    self.set_var(&param.name, &default);
                    Ok(default)
                } else {
                    Ok(value)
                }
            }
            ParamOp::UseReplacement => {
                if value.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(self.expand_operand(&param.word, out).await?.text)
                }
            }
            ParamOp::RemovePrefixShort => {
                let pattern = self.expand_operand(&param.word, out).await?.pattern;
                Ok(strip_prefix_glob(&value, &pattern, false))
            }
            ParamOp::RemovePrefixLong => {
                let pattern = self.expand_operand(&param.word, out).await?.pattern;
                Ok(strip_prefix_glob(&value, &pattern, true))
            }
            ParamOp::RemoveSuffixShort => {
                let pattern = self.expand_operand(&param.word, out).await?.pattern;
                Ok(strip_suffix_glob(&value, &pattern, false))
            }
            ParamOp::RemoveSuffixLong => {
                let pattern = self.expand_operand(&param.word, out).await?.pattern;
                Ok(strip_suffix_glob(&value, &pattern, true))
            }
        }
    }

    /// Run a command substitution: re-enter the evaluator on a state clone
    /// sharing the execution budget, capture stdout with trailing newlines
    /// stripped, pass stderr through.
    pub(crate) async fn run_capture(&mut self, script: &str, out: &mut Output) -> Result<String> {
        let parsed = Parser::new(script).parse()?;
        let mut sub = self.subshell_clone();
        let mut sub_out = Output::default();
        let status = sub.run_commands(&parsed.commands, &mut sub_out, None).await?;
        out.stderr.push_str(&sub_out.stderr);
        self.set_last_exit_code(status.code);
        Ok(sub_out.stdout.trim_end_matches('\n').to_string())
    }

    pub(crate) fn eval_arith_expr(&self, expr: &str) -> Result<i64> {
        eval_arith(expr, &|name| {
            let v = self.var_value(name);
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    }

    /// Pathname expansion: walk the filesystem per pattern component,
    /// matching entries with the glob matcher. Hidden entries only match
    /// patterns that name the leading dot. Results are sorted.
    async fn expand_pathname(&self, pattern: &str) -> Result<Vec<String>> {
        let absolute = pattern.starts_with('/');
        // Display paths relative to the pattern's own base
        let mut bases: Vec<String> = vec![String::new()];

        for component in pattern.split('/') {
            if component.is_empty() {
                continue;
            }
            let mut next: Vec<String> = Vec::new();
            for base in &bases {
                if glob::has_glob(component) {
                    let dir = self.pattern_base_path(absolute, base);
                    let mut entries = match self.fs().read_dir(&dir).await {
                        Ok(entries) => entries,
                        Err(_) => continue,
                    };
                    entries.sort_by(|a, b| a.name.cmp(&b.name));
                    for entry in entries {
                        if entry.name.starts_with('.') && !component.starts_with('.') {
                            continue;
                        }
                        if glob::glob_match(component, &entry.name) {
                            next.push(join_display(base, &entry.name));
                        }
                    }
                } else {
                    next.push(join_display(base, &glob::unescape(component)));
                }
            }
            bases = next;
            if bases.is_empty() {
                break;
            }
        }

        let mut matches = Vec::new();
        for base in bases {
            if base.is_empty() {
                continue;
            }
            let path = self.pattern_base_path(absolute, &base);
            if self.fs().exists(&path).await.unwrap_or(false) {
                matches.push(if absolute { format!("/{}", base) } else { base });
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn pattern_base_path(&self, absolute: bool, base: &str) -> std::path::PathBuf {
        if absolute {
            resolve_path(std::path::Path::new("/"), base)
        } else {
            resolve_path(self.cwd(), base)
        }
    }
}

fn join_display(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Remove the shortest/longest prefix of `value` matching `pattern`.
fn strip_prefix_glob(value: &str, pattern: &str, longest: bool) -> String {
    let indices: Vec<usize> = value
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(value.len()))
        .collect();
    let candidates: Box<dyn Iterator<Item = &usize> + '_> = if longest {
        Box::new(indices.iter().rev())
    } else {
        Box::new(indices.iter())
    };
    for &i in candidates {
        if glob::glob_match(pattern, &value[..i]) {
            return value[i..].to_string();
        }
    }
    value.to_string()
}

/// Remove the shortest/longest suffix of `value` matching `pattern`.
fn strip_suffix_glob(value: &str, pattern: &str, longest: bool) -> String {
    let indices: Vec<usize> = value
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(value.len()))
        .collect();
    let candidates: Box<dyn Iterator<Item = &usize> + '_> = if longest {
        Box::new(indices.iter())
    } else {
        Box::new(indices.iter().rev())
    };
    for &i in candidates {
        if glob::glob_match(pattern, &value[i..]) {
            return value[..i].to_string();
        }
    }
    value.to_string()
}

/// Brace expansion over the unquoted literal segments of a word:
/// `{a,b,c}` alternation and `{1..5}` numeric ranges, innermost-first via
/// recursion, with prefix and suffix concatenation.
pub(crate) fn brace_expand(word: &Word) -> Vec<Word> {
    for (idx, part) in word.parts.iter().enumerate() {
        let text = match part {
            WordPart::Literal(s) => s,
            _ => continue,
        };
        if let Some((start, end, alternatives)) = find_brace(text) {
            let prefix = &text[..start];
            let suffix = &text[end + 1..];
            let mut words = Vec::new();
            for alt in alternatives {
                let mut parts = word.parts[..idx].to_vec();
                parts.push(WordPart::Literal(format!("{}{}{}", prefix, alt, suffix)));
                parts.extend(word.parts[idx + 1..].iter().cloned());
                words.extend(brace_expand(&Word { parts }));
            }
            return words;
        }
    }
    vec![word.clone()]
}

/// Find the first expandable `{...}` in `text`: returns the byte offsets of
/// the braces and the alternatives.
fn find_brace(text: &str) -> Option<(usize, usize, Vec<String>)> {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        if bytes[start] != b'{' {
            continue;
        }
        let mut depth = 0;
        for end in start..bytes.len() {
            match bytes[end] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let content = &text[start + 1..end];
                        if let Some(alts) = brace_alternatives(content) {
                            return Some((start, end, alts));
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn brace_alternatives(content: &str) -> Option<Vec<String>> {
    // {a,b,c}: split on top-level commas
    let mut depth = 0;
    let mut has_comma = false;
    for b in content.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b',' if depth == 0 => has_comma = true,
            _ => {}
        }
    }
    if has_comma {
        let mut alts = Vec::new();
        let mut depth = 0;
        let mut current = String::new();
        for c in content.chars() {
            match c {
                '{' => {
                    depth += 1;
                    current.push(c);
                }
                '}' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => alts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        alts.push(current);
        return Some(alts);
    }

    // {1..5} and {5..1}: numeric ranges
    let (from, to) = content.split_once("..")?;
    let from: i64 = from.parse().ok()?;
    let to: i64 = to.parse().ok()?;
    let range: Vec<String> = if from <= to {
        (from..=to).map(|n| n.to_string()).collect()
    } else {
        (to..=from).rev().map(|n| n.to_string()).collect()
    };
    Some(range)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn expand_literal(s: &str) -> Vec<String> {
        brace_expand(&Word::literal(s))
            .iter()
            .map(|w| w.to_string())
            .collect()
    }

    #[test]
    fn brace_alternation() {
        assert_eq!(expand_literal("{a,b,c}"), vec!["a", "b", "c"]);
        assert_eq!(expand_literal("x{a,b}y"), vec!["xay", "xby"]);
    }

    #[test]
    fn brace_numeric_range() {
        assert_eq!(expand_literal("{1..3}"), vec!["1", "2", "3"]);
        assert_eq!(expand_literal("{3..1}"), vec!["3", "2", "1"]);
        assert_eq!(expand_literal("f{1..2}.txt"), vec!["f1.txt", "f2.txt"]);
    }

    #[test]
    fn brace_cartesian_product() {
        assert_eq!(
            expand_literal("{a,b}{1,2}"),
            vec!["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn brace_nested() {
        assert_eq!(expand_literal("{a,{b,c}}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn brace_no_expansion() {
        assert_eq!(expand_literal("plain"), vec!["plain"]);
        assert_eq!(expand_literal("{single}"), vec!["{single}"]);
    }

    #[test]
    fn strip_prefix() {
        assert_eq!(strip_prefix_glob("a/b/c", "*/", false), "b/c");
        assert_eq!(strip_prefix_glob("a/b/c", "*/", true), "c");
        assert_eq!(strip_prefix_glob("hello", "he", false), "llo");
        assert_eq!(strip_prefix_glob("hello", "xyz", false), "hello");
    }

    #[test]
    fn strip_suffix() {
        assert_eq!(strip_suffix_glob("main.test.ts", ".*", false), "main.test");
        assert_eq!(strip_suffix_glob("main.test.ts", ".*", true), "main");
        assert_eq!(strip_suffix_glob("hello", "xyz", true), "hello");
    }
}
