//! Human-readable diagnostic reports for engine errors.
//!
//! Converts each [`PrompyError`] into a multi-line message carrying the file
//! path, line number, searched paths, and reference chain that make the
//! failure actionable. Formatting lives here so the engine proper stays
//! silent; the CLI is the only caller that prints.

use std::fmt::Write as _;

use super::error::PrompyError;

/// Render an error into the multi-line diagnostic shown to users.
///
/// The first line always starts with `Error:` followed by the one-line
/// summary; location details are indented underneath.
pub fn render_diagnostic(err: &PrompyError) -> String {
    match err {
        PrompyError::MissingFragment {
            slug,
            file,
            line,
            searched,
        } => {
            let mut out = format!("Error: Missing fragment: @{slug}\n");
            push_location(&mut out, file.as_deref(), Some(*line));
            out.push_str("  searched paths:\n");
            if searched.is_empty() {
                out.push_str("    (none: the slug's sigil has no matching project or language)\n");
            }
            for path in searched {
                let _ = writeln!(out, "    - {}", path.display());
            }
            out
        }
        PrompyError::Cycle { chain, file, line } => {
            let arrows = chain
                .iter()
                .map(|s| format!("@{s}"))
                .collect::<Vec<_>>()
                .join(" -> ");
            let mut out = format!("Error: Cyclic reference detected: {arrows}\n");
            if let Some(file) = file {
                let _ = writeln!(out, "  in file: {}", file.display());
            }
            for slug in chain {
                let _ = writeln!(out, "  - {slug}");
            }
            let _ = writeln!(out, "  starting at line: {line}");
            out
        }
        PrompyError::MissingArgument {
            name,
            slug,
            file,
            line,
        } => {
            let mut out =
                format!("Error: Missing required argument '{name}' for fragment @{slug}\n");
            push_location(&mut out, file.as_deref(), Some(*line));
            out
        }
        PrompyError::TooManyArguments {
            slug,
            declared,
            given,
            file,
            line,
        } => {
            let mut out = format!(
                "Error: Too many positional arguments for fragment @{slug}: declared {declared}, got {given}\n"
            );
            push_location(&mut out, file.as_deref(), Some(*line));
            out
        }
        PrompyError::Syntax {
            detail,
            file,
            line,
            snippet,
        } => {
            let mut out = format!("Error: Template syntax error at line {line}: {detail}\n");
            push_location(&mut out, file.as_deref(), None);
            if let Some(snippet) = snippet {
                for snippet_line in snippet.lines() {
                    let _ = writeln!(out, "  {snippet_line}");
                }
            }
            out
        }
        PrompyError::UnboundVariable {
            name,
            file,
            line,
            suggestions,
        } => {
            let mut out = format!("Error: Unbound variable '{name}'\n");
            push_location(&mut out, file.as_deref(), *line);
            if !suggestions.is_empty() {
                out.push_str("  did you mean:\n");
                for candidate in suggestions {
                    let _ = writeln!(out, "    - {candidate}");
                }
            }
            out
        }
        PrompyError::InvalidSlug { slug, reason } => {
            format!("Error: Invalid fragment slug '{slug}': {reason}\n")
        }
        PrompyError::Io { path, source } => {
            format!("Error: I/O error on {}: {source}\n", path.display())
        }
        PrompyError::FragmentExists { slug, path } => {
            format!(
                "Error: Fragment already exists: @{slug}\n  at path: {}\n",
                path.display()
            )
        }
    }
}

fn push_location(out: &mut String, file: Option<&std::path::Path>, line: Option<usize>) {
    if let Some(file) = file {
        let _ = writeln!(out, "  in file: {}", file.display());
    }
    if let Some(line) = line {
        let _ = writeln!(out, "  at line: {line}");
    }
}

/// Build a one-line caret snippet pointing at a byte offset in `source`.
///
/// Used by the reference parser when reporting syntax errors. Returns the
/// offending line followed by a caret aligned under the offset.
pub fn caret_snippet(source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    let line = &source[line_start..line_end];
    let column = source[line_start..offset].chars().count();
    format!("{line}\n{}^", " ".repeat(column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_fragment_lists_searched_paths() {
        let err = PrompyError::MissingFragment {
            slug: "project/nope".into(),
            file: Some(PathBuf::from("top.md")),
            line: 1,
            searched: vec![
                PathBuf::from("/p/.prompy/projects/my-proj/nope.md"),
                PathBuf::from("/u/prompts/projects/my-proj/nope.md"),
            ],
        };
        let report = render_diagnostic(&err);
        assert!(report.starts_with("Error: Missing fragment: @project/nope\n"));
        assert!(report.contains("  in file: top.md\n"));
        assert!(report.contains("  at line: 1\n"));
        assert!(report.contains("    - /p/.prompy/projects/my-proj/nope.md\n"));
        assert!(report.contains("    - /u/prompts/projects/my-proj/nope.md\n"));
    }

    #[test]
    fn cycle_report_contains_chain_and_origin_line() {
        let err = PrompyError::Cycle {
            chain: vec!["<top>".into(), "a".into(), "b".into(), "a".into()],
            file: None,
            line: 4,
        };
        let report = render_diagnostic(&err);
        assert!(report.contains("@<top> -> @a -> @b -> @a"));
        assert!(report.contains("  - a\n"));
        assert!(report.contains("  starting at line: 4\n"));
    }

    #[test]
    fn caret_snippet_points_at_offset() {
        let snippet = caret_snippet("ab @x(,)\ncd", 6);
        assert_eq!(snippet, "ab @x(,)\n      ^");
    }

    #[test]
    fn caret_snippet_handles_offset_past_end() {
        let snippet = caret_snippet("abc", 99);
        assert_eq!(snippet, "abc\n   ^");
    }
}
