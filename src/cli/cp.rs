//! Copy a fragment to a new slug.

use anyhow::{Context as _, Result};
use clap::Args;

use super::common::{confirm, Session};
use crate::core::error::PrompyError;

/// Copy a prompt to a new location, byte-for-byte.
#[derive(Debug, Args)]
pub struct CpCommand {
    source_slug: String,
    dest_slug: String,

    /// Overwrite the destination without confirmation if it exists.
    #[arg(long, short = 'f')]
    force: bool,
}

impl CpCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let source = session
            .context
            .locate(&self.source_slug)
            .map_err(|searched| PrompyError::MissingFragment {
                slug: self.source_slug.clone(),
                file: None,
                line: 0,
                searched,
            })?;
        let destination = session
            .context
            .target_path(&self.dest_slug, Some(&source))?;

        if destination.exists()
            && !self.force
            && !confirm(&format!(
                "Destination already exists: {}. Overwrite?",
                destination.display()
            ))?
        {
            anyhow::bail!("copy aborted");
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::copy(&source, &destination).with_context(|| {
            format!(
                "copying {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        eprintln!("Copied '{}' to '{}'", self.source_slug, self.dest_slug);
        Ok(())
    }
}
