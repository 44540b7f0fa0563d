//! Inspect the language detection rules.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::Session;
use crate::config::detection::validate_detections;

/// Edit or validate the `detections.yaml` rules file.
#[derive(Debug, Args)]
pub struct DetectionsCommand {
    /// Validate the file instead of opening the editor.
    #[arg(long)]
    validate: bool,
}

impl DetectionsCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let path = &session.dirs.detections_file;
        if self.validate {
            match validate_detections(path) {
                Ok(rules) => {
                    println!(
                        "{} {} languages configured in {}",
                        "ok:".green(),
                        rules.len(),
                        path.display()
                    );
                    Ok(())
                }
                Err(problem) => anyhow::bail!(problem),
            }
        } else {
            crate::editor::launch_editor(path)
        }
    }
}
