//! Moving fragments and rewriting references to them.
//!
//! The refactorer operates textually by reference-token identity: it scans
//! each fragment body for `@slug(...)` tokens whose slug equals the old
//! slug exactly and splices the new slug over the slug bytes only. The
//! argument list, surrounding punctuation, whitespace, and the metadata
//! block are preserved byte-for-byte, so renaming `a` to `b` and back
//! restores a tree exactly. Writes are atomic per file.

use std::fs;
use std::path::PathBuf;

use crate::catalog::{self, ListFilters};
use crate::context::PromptContext;
use crate::core::error::{PrompyError, Result};
use crate::fragment::frontmatter_boundaries;
use crate::reference::{self, ArgValue, FragmentReference};
use crate::utils::fs as fsutil;

/// What a [`move_fragment`] call did.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Files whose references were rewritten.
    pub updated: Vec<PathBuf>,
}

/// Move a fragment to a new slug and update every reference to it.
///
/// The fragment file stays in the root it came from. Fails without touching
/// anything when the source is missing or the destination already exists.
pub fn move_fragment(
    context: &PromptContext,
    old_slug: &str,
    new_slug: &str,
) -> Result<MoveOutcome> {
    PromptContext::validate_slug(old_slug)?;
    PromptContext::validate_slug(new_slug)?;

    let source = context
        .locate(old_slug)
        .map_err(|searched| PrompyError::MissingFragment {
            slug: old_slug.to_string(),
            file: None,
            line: 0,
            searched,
        })?;
    let destination = context.target_path(new_slug, Some(&source))?;
    if destination.exists() {
        return Err(PrompyError::FragmentExists {
            slug: new_slug.to_string(),
            path: destination,
        });
    }

    if let Some(parent) = destination.parent() {
        fsutil::ensure_dir(parent)?;
    }
    fs::rename(&source, &destination).map_err(|io| PrompyError::Io {
        path: destination.clone(),
        source: io,
    })?;
    tracing::debug!(
        "moved @{old_slug} from {} to {}",
        source.display(),
        destination.display()
    );

    let catalog = catalog::list_fragments(context, &ListFilters::default())?;
    let mut updated = Vec::new();
    for entry in catalog.entries.iter().chain(catalog.shadowed.iter()) {
        if rewrite_references_in_file(&entry.path, old_slug, new_slug)? {
            updated.push(entry.path.clone());
        }
    }

    Ok(MoveOutcome {
        from: source,
        to: destination,
        updated,
    })
}

/// Rewrite references in one file; returns whether the file changed.
pub fn rewrite_references_in_file(
    path: &std::path::Path,
    old_slug: &str,
    new_slug: &str,
) -> Result<bool> {
    let raw = fsutil::read_to_string(path)?;
    let rewritten = rewrite_references(&raw, old_slug, new_slug);
    if rewritten == raw {
        return Ok(false);
    }
    fsutil::atomic_write(path, &rewritten)?;
    Ok(true)
}

/// Pure rewrite of every matching reference in a file's text.
///
/// Only the body is scanned; `@` sequences inside the metadata block are
/// left alone. Nested references are rewritten when their own slug matches.
pub fn rewrite_references(raw: &str, old_slug: &str, new_slug: &str) -> String {
    let body_start = frontmatter_boundaries(raw).map_or(0, |bounds| bounds.end);
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for top in reference::scan_references(&raw[body_start..]) {
        collect_slug_spans(&top, old_slug, body_start, &mut spans);
    }
    spans.sort_unstable();

    let mut out = raw.to_string();
    for &(start, end) in spans.iter().rev() {
        out.replace_range(start..end, new_slug);
    }
    out
}

/// Record the slug span of `reference` and of every nested reference whose
/// slug equals `target`, as absolute offsets.
fn collect_slug_spans(
    reference: &FragmentReference,
    target: &str,
    base: usize,
    spans: &mut Vec<(usize, usize)>,
) {
    if reference.slug == target {
        spans.push((base + reference.slug_start, base + reference.slug_end));
    }
    for argument in &reference.arguments {
        if let ArgValue::Reference(nested) = &argument.value {
            collect_slug_spans(nested, target, base, spans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn context(root: &Path) -> PromptContext {
        PromptContext::new(None, None, vec![root.to_path_buf()])
    }

    #[test]
    fn rewrite_replaces_exact_slug_only() {
        let text = "See {{ @old/name(x=\"1\") }} and @old/name-extended() too.\n";
        let out = rewrite_references(text, "old/name", "new/home/name");
        assert_eq!(
            out,
            "See {{ @new/home/name(x=\"1\") }} and @old/name-extended() too.\n"
        );
    }

    #[test]
    fn rewrite_preserves_argument_list_bytes() {
        let text = "{{ @old( a ,  k = \"v\" ) }}";
        let out = rewrite_references(text, "old", "new");
        assert_eq!(out, "{{ @new( a ,  k = \"v\" ) }}");
    }

    #[test]
    fn rewrite_covers_nested_references() {
        let text = "{{ @wrap(body=@old()) }}";
        assert_eq!(
            rewrite_references(text, "old", "new"),
            "{{ @wrap(body=@new()) }}"
        );
        assert_eq!(
            rewrite_references(text, "wrap", "cover"),
            "{{ @cover(body=@old()) }}"
        );
    }

    #[test]
    fn rewrite_skips_the_metadata_block() {
        let text = "---\ndescription: about @old\n---\nuse @old()\n";
        let out = rewrite_references(text, "old", "new");
        assert_eq!(out, "---\ndescription: about @old\n---\nuse @new()\n");
    }

    #[test]
    fn rename_round_trip_restores_bytes() {
        let text = "intro\n{{ @a(k=\"v\") }} mid @a() end\n";
        let there = rewrite_references(text, "a", "b");
        let back = rewrite_references(&there, "b", "a");
        assert_eq!(back, text);
    }

    #[test]
    fn move_fragment_renames_file_and_updates_callers() {
        let root = TempDir::new().unwrap();
        write(root.path(), "fragments/old/name.md", "the body\n");
        write(
            root.path(),
            "fragments/caller.md",
            "See {{ @old/name(x=\"1\") }}.\n",
        );

        let outcome = move_fragment(&context(root.path()), "old/name", "new/home/name").unwrap();

        assert_eq!(outcome.to, root.path().join("fragments/new/home/name.md"));
        assert!(outcome.to.is_file());
        assert!(!outcome.from.exists());
        assert_eq!(
            fs::read_to_string(root.path().join("fragments/caller.md")).unwrap(),
            "See {{ @new/home/name(x=\"1\") }}.\n"
        );
        assert_eq!(outcome.updated.len(), 1);
    }

    #[test]
    fn move_fragment_refuses_existing_destination() {
        let root = TempDir::new().unwrap();
        write(root.path(), "fragments/a.md", "A");
        write(root.path(), "fragments/b.md", "B");

        let err = move_fragment(&context(root.path()), "a", "b").unwrap_err();
        assert!(matches!(err, PrompyError::FragmentExists { .. }));
        assert!(root.path().join("fragments/a.md").is_file());
    }

    #[test]
    fn move_fragment_reports_missing_source() {
        let root = TempDir::new().unwrap();
        let err = move_fragment(&context(root.path()), "ghost", "somewhere").unwrap_err();
        assert!(matches!(err, PrompyError::MissingFragment { .. }));
    }

    #[test]
    fn self_references_in_the_moved_file_are_updated() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            "fragments/recursive-doc.md",
            "Mention of {{ @other() }} and docs for @recursive-doc usage.\n",
        );
        write(root.path(), "fragments/other.md", "O");

        move_fragment(&context(root.path()), "recursive-doc", "moved-doc").unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("fragments/moved-doc.md")).unwrap(),
            "Mention of {{ @other() }} and docs for @moved-doc usage.\n"
        );
    }
}
