//! Prompt file loading and frontmatter parsing.
//!
//! A prompt file is UTF-8 text with an optional YAML metadata block at the
//! top, delimited by `---` lines, followed by a Markdown template body:
//!
//! ```markdown
//! ---
//! description: Initialize the shell
//! categories: [setup]
//! args:
//!   shell: bash
//!   tasks: null
//! ---
//! Run `{{ shell }}` and then do: {{ tasks }}
//! ```
//!
//! A `null` argument value marks the argument as required. Either `args` or
//! `arguments` is accepted; when both appear they are merged and `arguments`
//! wins per key.

use std::path::{Path, PathBuf};

use gray_matter::engine::Engine;
use gray_matter::{Matter, Pod};
use serde::Deserialize;

use crate::core::error::Result;
use crate::utils::fs;

/// Custom gray_matter engine that returns raw frontmatter text unparsed.
///
/// Extracting the raw text first (instead of letting gray_matter parse YAML)
/// lets the loader report its own warnings on malformed metadata and keeps
/// the body split independent of YAML validity.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> std::result::Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// Byte boundaries of the frontmatter block, delimiters included.
///
/// `end` is the first byte of the body. Stored on every loaded file so the
/// rename refactorer can splice reference edits into the body without
/// touching the metadata bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterBoundaries {
    pub start: usize,
    pub end: usize,
}

/// Recognized metadata keys of a prompt file.
#[derive(Debug, Default, Deserialize)]
struct Metadata {
    description: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    args: Option<serde_yaml::Mapping>,
    arguments: Option<serde_yaml::Mapping>,
}

/// A parsed prompt file.
///
/// Loading is pure; the per-render cache lives in the resolver and is keyed
/// by canonicalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFile {
    /// The slug this file was loaded for (file stem when loaded directly).
    pub slug: String,
    /// Source path on disk.
    pub path: PathBuf,
    pub description: Option<String>,
    pub categories: Vec<String>,
    /// Declared arguments in declaration order; `None` means required.
    pub arguments: Vec<(String, Option<String>)>,
    /// Template body, exactly as it appears after the metadata block.
    pub body: String,
    /// Byte span of the frontmatter block in the raw file, if present.
    pub boundaries: Option<FrontmatterBoundaries>,
    /// Number of lines the metadata block occupies, so reference positions
    /// inside the body can be reported as file line numbers.
    pub body_line_offset: usize,
}

impl PromptFile {
    /// Load and parse a prompt file from disk.
    pub fn load(path: &Path, slug: Option<&str>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::parse(&raw, path, slug.unwrap_or(&fallback)))
    }

    /// Parse prompt file content already in memory.
    pub fn parse(raw: &str, path: &Path, slug: &str) -> Self {
        let boundaries = frontmatter_boundaries(raw);
        let (frontmatter_text, body) = match boundaries {
            Some(bounds) => {
                let matter: Matter<RawFrontmatter> = Matter::new();
                let extracted = matter
                    .parse::<String>(raw)
                    .ok()
                    .and_then(|parsed| parsed.data)
                    .filter(|text| !text.is_empty());
                (extracted, raw[bounds.end..].to_string())
            }
            None => (None, raw.to_string()),
        };

        let metadata = frontmatter_text
            .as_deref()
            .map(|text| match serde_yaml::from_str::<Metadata>(text) {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(
                        "ignoring malformed frontmatter in {}: {err}",
                        path.display()
                    );
                    Metadata::default()
                }
            })
            .unwrap_or_default();

        let body_line_offset = boundaries
            .map(|bounds| raw[..bounds.end].matches('\n').count())
            .unwrap_or(0);

        Self {
            slug: slug.to_string(),
            path: path.to_path_buf(),
            description: metadata.description,
            categories: metadata.categories,
            arguments: normalize_arguments(metadata.args, metadata.arguments),
            body,
            boundaries,
            body_line_offset,
        }
    }

    /// Whether any declared argument lacks a default.
    pub fn has_required_arguments(&self) -> bool {
        self.arguments.iter().any(|(_, default)| default.is_none())
    }

    /// Default bindings for this file's declared arguments.
    ///
    /// Used as the initial scope when the file itself is the top of a
    /// render; required arguments are simply absent.
    pub fn default_scope(&self) -> std::collections::HashMap<String, String> {
        self.arguments
            .iter()
            .filter_map(|(name, default)| default.clone().map(|value| (name.clone(), value)))
            .collect()
    }

    /// Argument signature for listings, e.g. `(tasks, shell=bash)`.
    pub fn signature(&self) -> String {
        if self.arguments.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .arguments
            .iter()
            .map(|(name, default)| match default {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect();
        format!("({})", parts.join(", "))
    }
}

/// Find the byte span of the frontmatter block.
///
/// The block must start at byte 0 with a line equal to `---` and runs
/// through the next `---` line; trailing whitespace on the delimiter lines
/// is tolerated. Returns `None` when the file has no metadata block.
pub fn frontmatter_boundaries(content: &str) -> Option<FrontmatterBoundaries> {
    let first_line_end = content.find('\n')?;
    if content[..first_line_end].trim_end() != "---" {
        return None;
    }

    let mut cursor = first_line_end + 1;
    while cursor <= content.len() {
        let line_end = content[cursor..]
            .find('\n')
            .map_or(content.len(), |i| cursor + i);
        if content[cursor..line_end].trim_end() == "---" {
            let end = if line_end < content.len() {
                line_end + 1
            } else {
                line_end
            };
            return Some(FrontmatterBoundaries { start: 0, end });
        }
        if line_end == content.len() {
            break;
        }
        cursor = line_end + 1;
    }
    None
}

/// Merge the `args` and `arguments` metadata tables into one ordered list.
///
/// `args` entries come first in declaration order; `arguments` entries
/// override matching names in place and append new ones. Non-scalar values
/// are skipped with a warning.
fn normalize_arguments(
    args: Option<serde_yaml::Mapping>,
    arguments: Option<serde_yaml::Mapping>,
) -> Vec<(String, Option<String>)> {
    let mut table: Vec<(String, Option<String>)> = Vec::new();
    for mapping in [args, arguments].into_iter().flatten() {
        for (key, value) in mapping {
            let Some(name) = key.as_str().map(str::to_string) else {
                tracing::warn!("skipping non-string argument name {key:?}");
                continue;
            };
            let default = match value {
                serde_yaml::Value::Null => None,
                serde_yaml::Value::String(s) => Some(s),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                other => {
                    tracing::warn!("skipping non-scalar default for argument '{name}': {other:?}");
                    continue;
                }
            };
            match table.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = default,
                None => table.push((name, default)),
            }
        }
    }
    table
}
