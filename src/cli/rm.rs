//! Remove a fragment file.

use anyhow::{Context as _, Result};
use clap::Args;

use super::common::{confirm, Session};
use crate::core::error::PrompyError;

/// Remove a prompt.
#[derive(Debug, Args)]
pub struct RmCommand {
    prompt_slug: String,

    /// Remove without confirmation.
    #[arg(long, short = 'f')]
    force: bool,
}

impl RmCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let path = session
            .context
            .locate(&self.prompt_slug)
            .map_err(|searched| PrompyError::MissingFragment {
                slug: self.prompt_slug.clone(),
                file: None,
                line: 0,
                searched,
            })?;

        if !self.force && !confirm(&format!("Remove prompt '{}'?", self.prompt_slug))? {
            anyhow::bail!("remove aborted");
        }

        std::fs::remove_file(&path)
            .with_context(|| format!("removing {}", path.display()))?;
        eprintln!("Removed '{}'", self.prompt_slug);
        Ok(())
    }
}
