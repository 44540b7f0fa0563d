//! Promote the one-off prompt to a reusable fragment.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::common::{confirm, Session};
use crate::cache;
use crate::utils::fs as fsutil;

/// Save the current cached prompt under a slug.
#[derive(Debug, Args)]
pub struct SaveCommand {
    /// Destination slug, e.g. `generic/init-shell` or `project/setup`.
    prompt_slug: String,

    /// Description stored in the fragment's metadata.
    #[arg(long, short = 'd')]
    description: Option<String>,

    /// Category to tag the fragment with; repeatable.
    #[arg(long = "category", short = 'c', value_name = "NAME")]
    categories: Vec<String>,

    /// Overwrite an existing fragment without confirmation.
    #[arg(long, short = 'f')]
    force: bool,
}

#[derive(Serialize)]
struct SavedMetadata {
    description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
}

impl SaveCommand {
    /// A bare save with no metadata flags, used by `new --save`.
    pub fn plain(slug: &str) -> Self {
        Self {
            prompt_slug: slug.to_string(),
            description: None,
            categories: Vec::new(),
            force: true,
        }
    }

    pub fn execute(&self, session: &Session) -> Result<()> {
        let project = session.require_project()?;
        let content = cache::load(&session.dirs.cache_dir, project)?
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("no current prompt; create one with 'prompy new' first")
            })?;

        let destination = session.context.target_path(&self.prompt_slug, None)?;
        if destination.exists()
            && !self.force
            && !confirm(&format!(
                "Fragment already exists at {}. Overwrite?",
                destination.display()
            ))?
        {
            anyhow::bail!("save aborted");
        }

        let description = match &self.description {
            Some(description) => description.clone(),
            None => derive_description(&content),
        };
        let metadata = serde_yaml::to_string(&SavedMetadata {
            description,
            categories: self.categories.clone(),
        })?;
        let rendered = format!("---\n{}---\n\n{}", metadata, content.trim_start());
        fsutil::atomic_write(&destination, &rendered)?;

        eprintln!("Prompt saved to {}", destination.display());
        Ok(())
    }
}

/// First sentence of the first paragraph, clipped to 80 characters.
fn derive_description(content: &str) -> String {
    let first_paragraph = content
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\n', " ");
    let mut description = first_paragraph
        .split('.')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if description.chars().count() > 80 {
        description = format!(
            "{}...",
            description.chars().take(77).collect::<String>()
        );
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_is_first_sentence() {
        assert_eq!(
            derive_description("Fix the tests. Then celebrate.\n\nMore."),
            "Fix the tests"
        );
    }

    #[test]
    fn long_descriptions_are_clipped() {
        let long = "x".repeat(120);
        let derived = derive_description(&long);
        assert_eq!(derived.chars().count(), 80);
        assert!(derived.ends_with("..."));
    }
}
