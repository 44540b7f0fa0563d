//! Fragment reference parsing and template preprocessing.
//!
//! A fragment reference names another prompt file and an argument list:
//!
//! ```text
//! @generic/init-shell
//! @finish-when(tasks="run the suite")
//! @wrap(body=@generic/all-tests-pass(), style=heading)
//! ```
//!
//! References are recognized in two equivalent surface forms: inside a
//! template expression (`{{ @slug(...) }}`) and bare in the surrounding text
//! (`@slug(...)`, the legacy form). `@@` escapes a literal `@`.
//!
//! # Argument grammar
//!
//! ```text
//! arg-list  := (arg ("," arg)*)?
//! arg       := keyword "=" value | value
//! value     := string | reference | identifier
//! string    := '"' ... '"' | "'" ... "'"
//! reference := "@" slug ("(" arg-list ")")?
//! ```
//!
//! String literals support backslash escapes of the quote character and of
//! the backslash itself; everything else is literal. Identifiers are
//! barewords resolved against the caller's scope at evaluation time.
//!
//! # Preprocessing
//!
//! [`preprocess`] lowers both surface forms into calls of the reserved
//! [`include_fragment`](crate::constants::INCLUDE_FUNCTION) template
//! function, which the resolver registers with the host engine. Nested
//! references in argument position are hoisted into `{% set %}` assignments
//! immediately before the enclosing expression so that argument resolution
//! happens in source order, before the callee's frame is pushed. String
//! literal argument values are not re-quoted into the generated source at
//! all: the host engine performs no escape processing inside strings, so a
//! backslash or mixed quotes would corrupt the generated call. Each parsed
//! literal is instead collected on the side and referenced through a
//! reserved `__prompy_lit_<n>` scope binding. Outside of those hoisted
//! literals the rewrite never adds or removes newlines, so host-engine
//! line numbers stay valid for the original text.

use crate::constants::INCLUDE_FUNCTION;

/// A parse problem, located by byte offset into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub message: String,
    pub offset: usize,
}

impl SyntaxIssue {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// One argument value in a reference's argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Quoted string literal, unescaped.
    Str(String),
    /// Bareword looked up in the caller's scope at evaluation time.
    Ident(String),
    /// Nested reference, resolved recursively.
    Reference(Box<FragmentReference>),
}

/// A positional (`name == None`) or keyword argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: ArgValue,
}

/// A parsed `@slug(args...)` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentReference {
    pub slug: String,
    /// All arguments in source order.
    pub arguments: Vec<Argument>,
    /// Byte span of the whole token, `@` through closing paren.
    pub start: usize,
    pub end: usize,
    /// Byte span of the slug alone, used by the rename refactorer.
    pub slug_start: usize,
    pub slug_end: usize,
    /// 1-based position of the `@` in the scanned text.
    pub line: usize,
    pub column: usize,
}

impl FragmentReference {
    /// Positional argument values in source order.
    pub fn positional(&self) -> Vec<&ArgValue> {
        self.arguments
            .iter()
            .filter(|arg| arg.name.is_none())
            .map(|arg| &arg.value)
            .collect()
    }

    /// Keyword arguments in insertion order; a later duplicate overrides an
    /// earlier one in place.
    pub fn keywords(&self) -> Vec<(&str, &ArgValue)> {
        let mut out: Vec<(&str, &ArgValue)> = Vec::new();
        for arg in &self.arguments {
            if let Some(name) = arg.name.as_deref() {
                match out.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(entry) => entry.1 = &arg.value,
                    None => out.push((name, &arg.value)),
                }
            }
        }
        out
    }
}

fn is_slug_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_slug_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'/' | b'-')
}

fn is_bareword_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.')
}

/// 1-based line and column of a byte offset.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let line = src[..offset].matches('\n').count() + 1;
    let line_start = src[..offset].rfind('\n').map_or(0, |i| i + 1);
    let column = src[line_start..offset].chars().count() + 1;
    (line, column)
}

/// Try to parse a reference whose `@` sits at byte `at`.
///
/// Returns `None` when the `@` does not begin a reference (next character is
/// not a valid slug start), so callers can copy it through as plain text.
pub fn try_parse_reference(
    src: &str,
    at: usize,
) -> Option<std::result::Result<FragmentReference, SyntaxIssue>> {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes.get(at), Some(&b'@'));

    let slug_start = at + 1;
    if !bytes.get(slug_start).copied().is_some_and(is_slug_start) {
        return None;
    }

    let mut slug_end = slug_start + 1;
    while bytes.get(slug_end).copied().is_some_and(is_slug_byte) {
        slug_end += 1;
    }

    let (arguments, end) = if bytes.get(slug_end) == Some(&b'(') {
        match parse_argument_list(src, slug_end) {
            Ok(parsed) => parsed,
            Err(issue) => return Some(Err(issue)),
        }
    } else {
        (Vec::new(), slug_end)
    };

    let (line, column) = line_col(src, at);
    Some(Ok(FragmentReference {
        slug: src[slug_start..slug_end].to_string(),
        arguments,
        start: at,
        end,
        slug_start,
        slug_end,
        line,
        column,
    }))
}

/// Parse `(arg, key=value, ...)` starting at the opening paren.
///
/// Returns the arguments and the byte offset just past the closing paren.
fn parse_argument_list(
    src: &str,
    open: usize,
) -> std::result::Result<(Vec<Argument>, usize), SyntaxIssue> {
    let bytes = src.as_bytes();
    let mut pos = skip_whitespace(src, open + 1);
    let mut arguments = Vec::new();

    if bytes.get(pos) == Some(&b')') {
        return Ok((arguments, pos + 1));
    }

    loop {
        let (argument, next) = parse_argument(src, pos)?;
        arguments.push(argument);
        pos = skip_whitespace(src, next);
        match bytes.get(pos) {
            Some(b')') => return Ok((arguments, pos + 1)),
            Some(b',') => {
                pos = skip_whitespace(src, pos + 1);
                if bytes.get(pos) == Some(&b')') {
                    return Err(SyntaxIssue::new("expected an argument after ','", pos));
                }
            }
            Some(_) => {
                return Err(SyntaxIssue::new("expected ',' or ')' in argument list", pos));
            }
            None => {
                return Err(SyntaxIssue::new("unclosed argument list", open));
            }
        }
    }
}

fn parse_argument(src: &str, at: usize) -> std::result::Result<(Argument, usize), SyntaxIssue> {
    let bytes = src.as_bytes();
    let pos = skip_whitespace(src, at);

    match bytes.get(pos) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let (value, next) = parse_string(src, pos)?;
            let after = skip_whitespace(src, next);
            if bytes.get(after) == Some(&b'=') {
                return Err(SyntaxIssue::new("keyword name must be a bareword", pos));
            }
            Ok((
                Argument {
                    name: None,
                    value: ArgValue::Str(value),
                },
                next,
            ))
        }
        Some(b'@') => {
            let reference = expect_reference(src, pos)?;
            let end = reference.end;
            Ok((
                Argument {
                    name: None,
                    value: ArgValue::Reference(Box::new(reference)),
                },
                end,
            ))
        }
        Some(&b) if is_bareword_byte(b) => {
            let mut word_end = pos + 1;
            while bytes.get(word_end).copied().is_some_and(is_bareword_byte) {
                word_end += 1;
            }
            let word = &src[pos..word_end];
            let after = skip_whitespace(src, word_end);
            if bytes.get(after) == Some(&b'=') {
                validate_keyword_name(word, pos)?;
                let value_pos = skip_whitespace(src, after + 1);
                let (value, next) = parse_value(src, value_pos)?;
                Ok((
                    Argument {
                        name: Some(word.to_string()),
                        value,
                    },
                    next,
                ))
            } else {
                Ok((
                    Argument {
                        name: None,
                        value: ArgValue::Ident(word.to_string()),
                    },
                    word_end,
                ))
            }
        }
        _ => Err(SyntaxIssue::new("expected an argument value", pos)),
    }
}

fn parse_value(src: &str, at: usize) -> std::result::Result<(ArgValue, usize), SyntaxIssue> {
    let bytes = src.as_bytes();
    match bytes.get(at) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let (value, next) = parse_string(src, at)?;
            Ok((ArgValue::Str(value), next))
        }
        Some(b'@') => {
            let reference = expect_reference(src, at)?;
            let end = reference.end;
            Ok((ArgValue::Reference(Box::new(reference)), end))
        }
        Some(&b) if is_bareword_byte(b) => {
            let mut word_end = at + 1;
            while bytes.get(word_end).copied().is_some_and(is_bareword_byte) {
                word_end += 1;
            }
            Ok((ArgValue::Ident(src[at..word_end].to_string()), word_end))
        }
        _ => Err(SyntaxIssue::new("expected a value after '='", at)),
    }
}

fn expect_reference(src: &str, at: usize) -> std::result::Result<FragmentReference, SyntaxIssue> {
    match try_parse_reference(src, at) {
        Some(Ok(reference)) => Ok(reference),
        Some(Err(issue)) => Err(issue),
        None => Err(SyntaxIssue::new("'@' does not begin a fragment slug", at)),
    }
}

/// Unescape a quoted string starting at the opening quote.
///
/// Only `\<quote>` and `\\` are escape sequences; any other backslash is
/// kept verbatim.
fn parse_string(src: &str, open: usize) -> std::result::Result<(String, usize), SyntaxIssue> {
    let quote = src.as_bytes()[open] as char;
    let mut value = String::new();
    let mut chars = src[open + 1..].char_indices();

    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some((_, escaped)) if escaped == quote || escaped == '\\' => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            }
        } else if ch == quote {
            return Ok((value, open + 1 + i + ch.len_utf8()));
        } else {
            value.push(ch);
        }
    }
    Err(SyntaxIssue::new(
        format!("unclosed string literal (started with {quote})"),
        open,
    ))
}

fn validate_keyword_name(name: &str, offset: usize) -> std::result::Result<(), SyntaxIssue> {
    let bytes = name.as_bytes();
    let valid = is_slug_start(bytes[0])
        && bytes
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(SyntaxIssue::new(
            format!("invalid keyword name '{name}'"),
            offset,
        ));
    }
    if name.starts_with("__") {
        return Err(SyntaxIssue::new(
            format!("keyword name '{name}' uses the reserved '__' prefix"),
            offset,
        ));
    }
    Ok(())
}

fn skip_whitespace(src: &str, mut pos: usize) -> usize {
    let bytes = src.as_bytes();
    while bytes.get(pos).copied().is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}

/// Leniently collect every well-formed reference in `text`.
///
/// Used by the rename refactorer: malformed argument lists and plain `@`
/// characters are skipped rather than reported, and `@@` escape pairs are
/// stepped over. Tokens are returned in source order.
pub fn scan_references(text: &str) -> Vec<FragmentReference> {
    let bytes = text.as_bytes();
    let mut references = Vec::new();
    let mut i = 0;
    while i < text.len() {
        if bytes[i] != b'@' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'@') {
            i += 2;
            continue;
        }
        match try_parse_reference(text, i) {
            Some(Ok(reference)) => {
                i = reference.end;
                references.push(reference);
            }
            _ => i += 1,
        }
    }
    references
}

/// A template body lowered for the host engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedTemplate {
    /// Rewritten source with references lowered to reserved calls.
    pub source: String,
    /// String-literal argument values, in emission order. The rewritten
    /// source refers to them as `__prompy_lit_<index>`; the renderer binds
    /// them into the scope before evaluation.
    pub literals: Vec<String>,
}

/// Lower fragment references into reserved-function calls.
///
/// Produces template source the host engine can evaluate natively:
///
/// - `{{ @slug(args) }}` becomes `{{ include_fragment(__slug="slug", ...) }}`
/// - bare `@slug(args)` in surrounding text becomes the same wrapped form
/// - `@@` becomes a literal `@`
/// - nested references in argument position are hoisted into `{% set %}`
///   assignments placed immediately before the enclosing expression
/// - string-literal argument values are collected into
///   [`PreprocessedTemplate::literals`] and referenced by scope binding
///
/// The reference's line number and the leading whitespace of its line are
/// passed along as the reserved `__line` and `__indent` keyword arguments.
pub fn preprocess(source: &str) -> std::result::Result<PreprocessedTemplate, SyntaxIssue> {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len() + 64);
    let mut temp_counter = 0usize;
    let mut literals = Vec::new();
    let mut i = 0;

    while i < source.len() {
        if source[i..].starts_with("{{") {
            let close = find_expression_end(source, i)?;
            rewrite_expression(source, i, close, &mut temp_counter, &mut literals, &mut out)?;
            i = close + 2;
        } else if source[i..].starts_with("{%") {
            i = copy_block_tag(source, i, &mut out);
        } else if source[i..].starts_with("{#") {
            let end = source[i..].find("#}").map_or(source.len(), |p| i + p + 2);
            out.push_str(&source[i..end]);
            i = end;
        } else if bytes[i] == b'@' {
            if bytes.get(i + 1) == Some(&b'@') {
                out.push('@');
                i += 2;
            } else {
                match try_parse_reference(source, i) {
                    None => {
                        out.push('@');
                        i += 1;
                    }
                    Some(Err(issue)) => return Err(issue),
                    Some(Ok(reference)) => {
                        let indent = line_indent(source, i);
                        let mut prelude = String::new();
                        let call = emit_call(
                            &reference,
                            &indent,
                            &mut temp_counter,
                            &mut literals,
                            &mut prelude,
                        )?;
                        out.push_str(&prelude);
                        out.push_str("{{ ");
                        out.push_str(&call);
                        out.push_str(" }}");
                        i = reference.end;
                    }
                }
            }
        } else {
            let ch = source[i..].chars().next().expect("in-bounds char");
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Ok(PreprocessedTemplate {
        source: out,
        literals,
    })
}

/// Copy a `{% ... %}` tag through verbatim; `{% raw %}` bodies are copied
/// whole so references inside them stay literal.
fn copy_block_tag(source: &str, open: usize, out: &mut String) -> usize {
    let close = source[open..].find("%}").map_or(source.len(), |p| open + p + 2);
    let tag_body = source[open + 2..close.saturating_sub(2).max(open + 2)]
        .trim_start_matches('-')
        .trim();
    if tag_body == "raw" {
        let end = source[close..]
            .find("endraw")
            .and_then(|p| source[close + p..].find("%}").map(|q| close + p + q + 2))
            .unwrap_or(source.len());
        out.push_str(&source[open..end]);
        return end;
    }
    out.push_str(&source[open..close]);
    close
}

/// Find the `}}` that closes the expression opened at `open`, skipping
/// quoted strings.
fn find_expression_end(source: &str, open: usize) -> std::result::Result<usize, SyntaxIssue> {
    let bytes = source.as_bytes();
    let mut i = open + 2;
    while i < source.len() {
        match bytes[i] {
            b'}' if source[i..].starts_with("}}") => return Ok(i),
            b'"' | b'\'' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < source.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            _ => {
                i += source[i..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    Err(SyntaxIssue::new("unclosed '{{' expression", open))
}

/// Rewrite the inside of one `{{ ... }}` expression, replacing references
/// with reserved-function calls and emitting hoisted assignments first.
fn rewrite_expression(
    source: &str,
    open: usize,
    close: usize,
    temp_counter: &mut usize,
    literals: &mut Vec<String>,
    out: &mut String,
) -> std::result::Result<(), SyntaxIssue> {
    let bytes = source.as_bytes();
    let indent = line_indent(source, open);
    let mut prelude = String::new();
    let mut expr = String::new();
    let mut i = open + 2;

    while i < close {
        match bytes[i] {
            b'@' => {
                if bytes.get(i + 1) == Some(&b'@') {
                    expr.push('@');
                    i += 2;
                    continue;
                }
                match try_parse_reference(source, i) {
                    None => {
                        expr.push('@');
                        i += 1;
                    }
                    Some(Err(issue)) => return Err(issue),
                    Some(Ok(reference)) => {
                        if reference.end > close {
                            return Err(SyntaxIssue::new(
                                "fragment reference is not closed before '}}'",
                                i,
                            ));
                        }
                        let call =
                            emit_call(&reference, &indent, temp_counter, literals, &mut prelude)?;
                        expr.push_str(&call);
                        i = reference.end;
                    }
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                let start = i;
                i += 1;
                while i < close && bytes[i] != quote {
                    i += 1;
                }
                i = (i + 1).min(close);
                expr.push_str(&source[start..i]);
            }
            _ => {
                let ch = source[i..].chars().next().expect("in-bounds char");
                expr.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    out.push_str(&prelude);
    out.push_str("{{");
    out.push_str(&expr);
    out.push_str("}}");
    Ok(())
}

/// Build the reserved-function call expression for one reference.
///
/// Nested reference arguments are resolved via hoisted `{% set %}` tags
/// appended to `prelude`, depth-first, so their side effects run in source
/// order before the outer call.
fn emit_call(
    reference: &FragmentReference,
    indent: &str,
    temp_counter: &mut usize,
    literals: &mut Vec<String>,
    prelude: &mut String,
) -> std::result::Result<String, SyntaxIssue> {
    let mut call = format!(
        "{INCLUDE_FUNCTION}(__slug=\"{}\", __line={}",
        reference.slug, reference.line
    );
    if !indent.is_empty() {
        call.push_str(", __indent=\"");
        call.push_str(indent);
        call.push('"');
    }

    for (index, value) in reference.positional().into_iter().enumerate() {
        let expr = value_expression(value, temp_counter, literals, prelude)?;
        call.push_str(&format!(", __pos{index}={expr}"));
    }
    for (name, value) in reference.keywords() {
        let expr = value_expression(value, temp_counter, literals, prelude)?;
        call.push_str(&format!(", {name}={expr}"));
    }
    call.push(')');
    Ok(call)
}

fn value_expression(
    value: &ArgValue,
    temp_counter: &mut usize,
    literals: &mut Vec<String>,
    prelude: &mut String,
) -> std::result::Result<String, SyntaxIssue> {
    match value {
        ArgValue::Str(literal) => {
            // The host engine has no escape processing inside string
            // literals, so the unescaped value is bound into the scope
            // instead of being re-quoted into the source.
            let name = format!("__prompy_lit_{}", literals.len());
            literals.push(literal.clone());
            Ok(name)
        }
        ArgValue::Ident(word) => Ok(word.clone()),
        ArgValue::Reference(nested) => {
            // Indent never applies to argument values; multi-line results
            // are substituted verbatim.
            let call = emit_call(nested, "", temp_counter, literals, prelude)?;
            let name = format!("__prompy_arg_{temp_counter}");
            *temp_counter += 1;
            prelude.push_str("{% set ");
            prelude.push_str(&name);
            prelude.push_str(" = ");
            prelude.push_str(&call);
            prelude.push_str(" %}");
            Ok(name)
        }
    }
}

/// The whitespace prefix of the line containing `pos`, or empty when
/// anything other than whitespace precedes the position on its line.
fn line_indent(source: &str, pos: usize) -> String {
    let line_start = source[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &source[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        String::new()
    }
}
