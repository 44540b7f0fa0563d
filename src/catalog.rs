//! Fragment enumeration across search roots.
//!
//! The catalog walks every configured root in precedence order and yields
//! one entry per prompt file, slugified by stripping the root-specific
//! prefix and the `.md` suffix. A slug present in two roots resolves to
//! the higher-precedence file; the shadowed entry is reported separately
//! so callers can surface it.
//!
//! Ordering is deterministic: by root precedence, then by path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::{
    FRAGMENTS_SUBDIR, LANGUAGES_SUBDIR, PROJECTS_SUBDIR, PROMPT_EXTENSION,
};
use crate::context::PromptContext;
use crate::core::error::Result;
use crate::fragment::PromptFile;

/// One discoverable fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub slug: String,
    pub path: PathBuf,
    pub description: Option<String>,
    /// Categories from the file's metadata, used by listing filters.
    pub categories: Vec<String>,
    /// Rendered argument signature, e.g. `(tasks, shell=bash)`.
    pub signature: String,
}

/// The result of an enumeration pass.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    /// Lower-precedence duplicates hidden by an earlier root.
    pub shadowed: Vec<CatalogEntry>,
}

/// Filters applied by [`list_fragments`].
///
/// `project` and `language` override the detected names before
/// enumeration; `category` keeps only fragments carrying that category
/// (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub project: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
}

/// Enumerate every known fragment.
pub fn list_fragments(context: &PromptContext, filters: &ListFilters) -> Result<Catalog> {
    let effective = if filters.project.is_some() || filters.language.is_some() {
        context.with_names(
            filters
                .project
                .clone()
                .or_else(|| context.project().map(String::from)),
            filters
                .language
                .clone()
                .or_else(|| context.language().map(String::from)),
        )
    } else {
        context.clone()
    };

    let mut catalog = Catalog::default();
    let mut seen: HashSet<String> = HashSet::new();

    for root in effective.roots() {
        let mut found: Vec<(String, PathBuf)> = Vec::new();
        collect_subtree(&root.join(FRAGMENTS_SUBDIR), "", &mut found);
        if let Some(project) = effective.project() {
            collect_subtree(
                &root.join(PROJECTS_SUBDIR).join(project),
                "project/",
                &mut found,
            );
        }
        if let Some(language) = effective.language() {
            collect_subtree(
                &root.join(LANGUAGES_SUBDIR).join(language),
                "language/",
                &mut found,
            );
        }
        found.sort_by(|a, b| a.1.cmp(&b.1));

        for (slug, path) in found {
            let entry = match load_entry(&slug, &path) {
                Some(entry) => entry,
                None => continue,
            };
            // Precedence is decided before filtering so a filtered-out
            // winner still hides its lower-precedence duplicate.
            let is_primary = seen.insert(slug);
            if let Some(category) = filters.category.as_deref() {
                let wanted = category.to_lowercase();
                if !entry
                    .categories
                    .iter()
                    .any(|c| c.to_lowercase() == wanted)
                {
                    continue;
                }
            }
            if is_primary {
                catalog.entries.push(entry);
            } else {
                catalog.shadowed.push(entry);
            }
        }
    }
    Ok(catalog)
}

/// Collect `(slug, path)` pairs for every prompt file under `dir`.
fn collect_subtree(dir: &Path, slug_prefix: &str, found: &mut Vec<(String, PathBuf)>) {
    if !dir.is_dir() {
        return;
    }
    for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(PROMPT_EXTENSION)
        {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let mut slug_path: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if let Some(last) = slug_path.last_mut() {
            if let Some(stem) = last.strip_suffix(&format!(".{PROMPT_EXTENSION}")) {
                *last = stem.to_string();
            }
        }
        found.push((
            format!("{slug_prefix}{}", slug_path.join("/")),
            path.to_path_buf(),
        ));
    }
}

fn load_entry(slug: &str, path: &Path) -> Option<CatalogEntry> {
    match PromptFile::load(path, Some(slug)) {
        Ok(file) => Some(CatalogEntry {
            slug: slug.to_string(),
            path: path.to_path_buf(),
            description: file.description.clone(),
            categories: file.categories.clone(),
            signature: file.signature(),
        }),
        Err(err) => {
            tracing::warn!("skipping unreadable fragment {}: {err}", path.display());
            None
        }
    }
}

/// Options for [`help_text`].
#[derive(Debug, Clone)]
pub struct HelpTextOptions {
    /// Prefix shown before each slug (`"@"` for editor comments).
    pub slug_prefix: &'static str,
    /// Append the reference syntax reminder at the end.
    pub include_syntax: bool,
    /// Start with the `PROMPY AVAILABLE FRAGMENTS` banner.
    pub include_header: bool,
}

impl Default for HelpTextOptions {
    fn default() -> Self {
        Self {
            slug_prefix: "@",
            include_syntax: true,
            include_header: true,
        }
    }
}

/// Build the available-fragments help block shown in editors and listings.
pub fn help_text(
    context: &PromptContext,
    catalog: &Catalog,
    options: &HelpTextOptions,
) -> String {
    let mut out = String::new();
    if options.include_header {
        out.push_str("PROMPY AVAILABLE FRAGMENTS:\n");
        out.push_str("--------------------------\n\n");
    }

    let section = |title: String, entries: &[&CatalogEntry], out: &mut String| {
        if entries.is_empty() {
            return;
        }
        out.push_str(&title);
        out.push_str(":\n");
        for entry in entries {
            out.push_str(&format!(
                "  {}{}{}\n",
                options.slug_prefix, entry.slug, entry.signature
            ));
            if let Some(description) = &entry.description {
                out.push_str(&format!("    {description}\n"));
            }
            if !entry.categories.is_empty() {
                out.push_str(&format!("    Categories: {}\n", entry.categories.join(", ")));
            }
        }
        out.push('\n');
    };

    let project_entries: Vec<&CatalogEntry> = catalog
        .entries
        .iter()
        .filter(|e| e.slug.starts_with("project/"))
        .collect();
    let language_entries: Vec<&CatalogEntry> = catalog
        .entries
        .iter()
        .filter(|e| e.slug.starts_with("language/"))
        .collect();
    let fragment_entries: Vec<&CatalogEntry> = catalog
        .entries
        .iter()
        .filter(|e| !e.slug.starts_with("project/") && !e.slug.starts_with("language/"))
        .collect();

    let project_title = match context.project() {
        Some(name) => format!("PROJECT FRAGMENTS (project: {name})"),
        None => "PROJECT FRAGMENTS".to_string(),
    };
    let language_title = match context.language() {
        Some(name) => format!("LANGUAGE FRAGMENTS (language: {name})"),
        None => "LANGUAGE FRAGMENTS".to_string(),
    };
    section(project_title, &project_entries, &mut out);
    section(language_title, &language_entries, &mut out);
    section("FRAGMENTS".to_string(), &fragment_entries, &mut out);

    if options.include_syntax {
        out.push_str("SYNTAX:\n");
        out.push_str("  @fragment-name(arg1, key=value)\n");
        out.push_str("  @path/to/fragment\n");
        out.push_str("  @project/fragment\n");
        out.push_str("  @language/fragment\n\n");
    }
    out
}
