//! Host-engine invocation and error translation.
//!
//! Wraps Tera with Prompy-specific behavior: every body is preprocessed to
//! lower fragment references into the reserved function call, rendered with
//! `render_str` on a throwaway engine instance, and any Tera failure is
//! parsed back into a structured [`PrompyError`] with the file, line, and
//! variable-name information users need.
//!
//! A fresh `Tera::default()` per evaluation is cheap (two empty maps) and
//! keeps each fragment's compilation isolated from its siblings.

use std::error::Error as _;
use std::path::PathBuf;

use regex::Regex;
use tera::{Context as TeraContext, Tera};

use crate::core::diagnostics::caret_snippet;
use crate::core::error::PrompyError;
use crate::reference::{self, SyntaxIssue};

/// Maximum Levenshtein distance, as a percentage of the variable name's
/// length, for "did you mean" suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Location of the body being evaluated, for error attribution.
#[derive(Debug, Clone, Default)]
pub(crate) struct EvalSite {
    /// File the body came from; `None` for the synthetic top-level body.
    pub file: Option<PathBuf>,
    /// Lines preceding the body in its file (the frontmatter block), added
    /// to body-relative line numbers so diagnostics point into the file.
    pub line_offset: usize,
}

/// Preprocess and render one body against a variable scope.
///
/// String-literal argument values collected during preprocessing are bound
/// into a copy of the scope as `__prompy_lit_<n>` so their quotes and
/// backslashes never appear in the generated source.
pub(crate) fn render_template(
    tera: &mut Tera,
    body: &str,
    context: &TeraContext,
    site: &EvalSite,
) -> Result<String, PrompyError> {
    let processed =
        reference::preprocess(body).map_err(|issue| syntax_error(body, &issue, site))?;
    tracing::trace!("rendering preprocessed body:\n{}", processed.source);

    let rendered = if processed.literals.is_empty() {
        tera.render_str(&processed.source, context)
    } else {
        let mut augmented = context.clone();
        for (index, literal) in processed.literals.iter().enumerate() {
            augmented.insert(format!("__prompy_lit_{index}"), literal);
        }
        tera.render_str(&processed.source, &augmented)
    };
    rendered.map_err(|err| translate_tera_error(&err, context, site))
}

/// Convert a parser-reported [`SyntaxIssue`] into a located error with a
/// caret snippet.
fn syntax_error(body: &str, issue: &SyntaxIssue, site: &EvalSite) -> PrompyError {
    let (line, _) = reference::line_col(body, issue.offset);
    PrompyError::Syntax {
        detail: issue.message.clone(),
        file: site.file.clone(),
        line: line + site.line_offset,
        snippet: Some(caret_snippet(body, issue.offset)),
    }
}

/// Parse a Tera error chain into a structured error.
///
/// Undefined-variable failures become [`PrompyError::UnboundVariable`] with
/// close-match suggestions drawn from the current scope; everything else is
/// reported as a template syntax error with the line Tera blamed.
fn translate_tera_error(
    error: &tera::Error,
    context: &TeraContext,
    site: &EvalSite,
) -> PrompyError {
    let messages = collect_messages(error);
    let line = extract_line(&messages).map(|l| l + site.line_offset);

    if let Some(name) = extract_variable_name(&messages) {
        let available = scope_variables(context);
        let suggestions = similar_variables(&name, &available);
        return PrompyError::UnboundVariable {
            name,
            file: site.file.clone(),
            line,
            suggestions,
        };
    }

    PrompyError::Syntax {
        detail: clean_messages(&messages),
        file: site.file.clone(),
        line: line.unwrap_or(site.line_offset + 1),
        snippet: None,
    }
}

/// Collect every message in the error source chain, outermost first.
fn collect_messages(error: &tera::Error) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages
}

/// Tera embeds `line:column` pairs in parse error messages.
fn extract_line(messages: &[String]) -> Option<usize> {
    let pattern = Regex::new(r"(\d+):(\d+)").ok()?;
    messages.iter().find_map(|msg| {
        pattern
            .captures(msg)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Extract the name from a `Variable \`foo\` not found` message.
fn extract_variable_name(messages: &[String]) -> Option<String> {
    let pattern = Regex::new(r"Variable `([^`]+)` not found").ok()?;
    messages.iter().find_map(|msg| {
        pattern
            .captures(msg)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Strip Tera's internal one-off template name from the chain and join the
/// useful parts.
fn clean_messages(messages: &[String]) -> String {
    let cleaned: Vec<String> = messages
        .iter()
        .map(|msg| {
            msg.replace("Failed to parse '__tera_one_off'", "template parse failed")
                .replace("Failed to render '__tera_one_off'", "template render failed")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string()
        })
        .filter(|msg| !msg.is_empty() && msg != "template parse failed" && msg != "template render failed")
        .collect();
    if cleaned.is_empty() {
        "template evaluation failed".to_string()
    } else {
        cleaned.join(": ")
    }
}

/// Top-level variable names visible in the scope.
fn scope_variables(context: &TeraContext) -> Vec<String> {
    match context.clone().into_json() {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Closest scope variables by edit distance, best first, at most three.
fn similar_variables(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<(String, usize)> = available
        .iter()
        .map(|candidate| (candidate.clone(), strsim::levenshtein(target, candidate)))
        .collect();
    scored.sort_by_key(|(_, distance)| *distance);
    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(candidate, _)| candidate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(body: &str, context: &TeraContext) -> Result<String, PrompyError> {
        let mut tera = Tera::default();
        render_template(&mut tera, body, context, &EvalSite::default())
    }

    #[test]
    fn plain_template_features_work() {
        let mut context = TeraContext::new();
        context.insert("name", "world");
        let out = render(
            "{% set greeting = \"hello\" %}{{ greeting }} {{ name | capitalize }}",
            &context,
        )
        .unwrap();
        assert_eq!(out, "hello World");
    }

    #[test]
    fn conditionals_and_loops_render() {
        let mut context = TeraContext::new();
        context.insert("mode", "full");
        let out = render(
            "{% if mode == \"full\" %}all{% elif mode == \"半\" %}some{% else %}none{% endif %}",
            &context,
        )
        .unwrap();
        assert_eq!(out, "all");
    }

    #[test]
    fn unbound_variable_is_structured_with_suggestions() {
        let mut context = TeraContext::new();
        context.insert("tasks", "x");
        let err = render("{{ task }}", &context).unwrap_err();
        match err {
            PrompyError::UnboundVariable {
                name, suggestions, ..
            } => {
                assert_eq!(name, "task");
                assert_eq!(suggestions, vec!["tasks".to_string()]);
            }
            other => panic!("expected UnboundVariable, got {other:?}"),
        }
    }

    #[test]
    fn tera_syntax_error_is_reported_with_a_line() {
        let context = TeraContext::new();
        let err = render("line one\n{% endif %}", &context).unwrap_err();
        match err {
            PrompyError::Syntax { line, .. } => assert!(line >= 1),
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn reference_syntax_error_carries_snippet_and_offset_line() {
        let context = TeraContext::new();
        let err = render("ok\n{{ @frag(, ) }}\n", &context).unwrap_err();
        match err {
            PrompyError::Syntax {
                line, snippet, ..
            } => {
                assert_eq!(line, 2);
                assert!(snippet.unwrap().contains('^'));
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn line_offset_shifts_reported_lines() {
        let context = TeraContext::new();
        let site = EvalSite {
            file: Some(PathBuf::from("frag.md")),
            line_offset: 4,
        };
        let mut tera = Tera::default();
        let err = render_template(&mut tera, "{{ @x(, ) }}", &context, &site).unwrap_err();
        match err {
            PrompyError::Syntax { line, file, .. } => {
                assert_eq!(line, 5);
                assert_eq!(file, Some(PathBuf::from("frag.md")));
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }
}
