//! Slug-to-path resolution across the configured search roots.
//!
//! A [`PromptContext`] holds the detected project and language names plus an
//! ordered list of search roots (the project-local `.prompy/` tree first,
//! then the user configuration `prompts/` tree). Within each root a slug is
//! rewritten according to its leading sigil before being joined:
//!
//! | slug | relative path |
//! |---|---|
//! | `project/<rest>` | `projects/<project>/<rest>.md` |
//! | `language/<rest>`, `environment/<rest>` | `languages/<language>/<rest>.md` |
//! | anything else | `fragments/<slug>.md` |
//!
//! Sigil rewrites are skipped entirely when the corresponding scalar is
//! empty, so `project/x` cannot resolve outside a detected project.

use std::path::{Path, PathBuf};

use crate::constants::{
    FRAGMENTS_SUBDIR, LANGUAGES_SUBDIR, PROJECTS_SUBDIR, PROMPT_EXTENSION,
};
use crate::core::error::{PrompyError, Result};
use crate::fragment::PromptFile;

/// The directories and names used to resolve prompt slugs.
#[derive(Debug, Clone)]
pub struct PromptContext {
    project: Option<String>,
    language: Option<String>,
    roots: Vec<PathBuf>,
}

impl PromptContext {
    /// Create a context. Empty project or language strings are treated as
    /// absent.
    pub fn new(
        project: Option<String>,
        language: Option<String>,
        roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            project: project.filter(|s| !s.is_empty()),
            language: language.filter(|s| !s.is_empty()),
            roots,
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Search roots in precedence order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Context with the same roots but a different project/language pair.
    ///
    /// Used by the catalog when a listing filter overrides detection.
    pub fn with_names(&self, project: Option<String>, language: Option<String>) -> Self {
        Self::new(project, language, self.roots.clone())
    }

    /// Reject empty, absolute, or traversing slugs.
    pub fn validate_slug(slug: &str) -> Result<()> {
        let reason = if slug.is_empty() {
            Some("slug is empty")
        } else if slug.starts_with('/') || slug.starts_with('\\') {
            Some("slug must be relative")
        } else if slug.split('/').any(|segment| segment == "..") {
            Some("slug must not contain '..'")
        } else if slug.split('/').any(str::is_empty) {
            Some("slug contains an empty path segment")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(PrompyError::InvalidSlug {
                slug: slug.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Root-relative path for a slug, or `None` when the slug's sigil has
    /// no matching project or language.
    fn relative_path(&self, slug: &str) -> Option<PathBuf> {
        let rewritten = if let Some(rest) = slug.strip_prefix("project/") {
            format!("{PROJECTS_SUBDIR}/{}/{rest}", self.project.as_deref()?)
        } else if let Some(rest) = slug
            .strip_prefix("language/")
            .or_else(|| slug.strip_prefix("environment/"))
        {
            format!("{LANGUAGES_SUBDIR}/{}/{rest}", self.language.as_deref()?)
        } else {
            format!("{FRAGMENTS_SUBDIR}/{slug}")
        };
        Some(PathBuf::from(format!("{rewritten}.{PROMPT_EXTENSION}")))
    }

    /// Every path the slug could live at, in precedence order.
    pub fn candidate_paths(&self, slug: &str) -> Vec<PathBuf> {
        match self.relative_path(slug) {
            Some(relative) => self.roots.iter().map(|root| root.join(&relative)).collect(),
            None => Vec::new(),
        }
    }

    /// Resolve a slug to the first existing file.
    ///
    /// The error value carries every probed path so the caller can build a
    /// `MissingFragment` diagnostic.
    pub fn locate(&self, slug: &str) -> std::result::Result<PathBuf, Vec<PathBuf>> {
        let candidates = self.candidate_paths(slug);
        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or(candidates)
    }

    /// The path a new fragment with this slug would be written to.
    ///
    /// Prefers the root containing `near` (used so a moved fragment stays in
    /// its tree), falling back to the first configured root.
    pub fn target_path(&self, slug: &str, near: Option<&Path>) -> Result<PathBuf> {
        Self::validate_slug(slug)?;
        let relative = self.relative_path(slug).ok_or_else(|| {
            let missing = if slug.starts_with("project/") {
                "no project is active"
            } else {
                "no language is active"
            };
            PrompyError::InvalidSlug {
                slug: slug.to_string(),
                reason: missing.to_string(),
            }
        })?;
        let root = near
            .and_then(|path| self.roots.iter().find(|root| path.starts_with(root)))
            .or_else(|| self.roots.first())
            .ok_or_else(|| PrompyError::InvalidSlug {
                slug: slug.to_string(),
                reason: "no search roots are configured".to_string(),
            })?;
        Ok(root.join(relative))
    }

    /// Locate and load a fragment in one step.
    pub fn load_slug(&self, slug: &str) -> Result<PromptFile> {
        Self::validate_slug(slug)?;
        let path = self.locate(slug).map_err(|searched| PrompyError::MissingFragment {
            slug: slug.to_string(),
            file: None,
            line: 0,
            searched,
        })?;
        PromptFile::load(&path, Some(slug))
    }
}
