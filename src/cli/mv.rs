//! Move a fragment and rewrite references to it.

use anyhow::Result;
use clap::Args;

use super::common::{confirm, Session};
use crate::core::error::PrompyError;
use crate::refactor;

/// Move or rename a prompt, updating `@old-slug(...)` references in every
/// known fragment file.
#[derive(Debug, Args)]
pub struct MvCommand {
    source_slug: String,
    dest_slug: String,

    /// Overwrite the destination without confirmation if it exists.
    #[arg(long, short = 'f')]
    force: bool,
}

impl MvCommand {
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
        if destination.exists() {
            if !self.force
                && !confirm(&format!(
                    "Destination already exists: {}. Overwrite?",
                    destination.display()
                ))?
            {
                anyhow::bail!("move aborted");
            }
            std::fs::remove_file(&destination)?;
        }

        let outcome =
            refactor::move_fragment(&session.context, &self.source_slug, &self.dest_slug)?;
        eprintln!("Moved '{}' to '{}'", self.source_slug, self.dest_slug);
        match outcome.updated.len() {
            0 => eprintln!("No references to update"),
            n => eprintln!("Updated references in {n} file(s)"),
        }
        Ok(())
    }
}
