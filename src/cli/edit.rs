//! Edit the one-off prompt or a named fragment.

use anyhow::Result;
use clap::Args;

use super::common::Session;
use crate::cache;
use crate::utils::fs as fsutil;

/// Open a prompt in the default editor.
///
/// With a `PROMPT_SLUG` argument the named fragment file is edited in
/// place; otherwise the project's current one-off prompt is edited,
/// creating it if needed. Piped stdin is appended before the editor opens.
#[derive(Debug, Args, Default)]
pub struct EditCommand {
    /// Fragment to edit instead of the one-off prompt.
    prompt_slug: Option<String>,
}

impl EditCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let stdin_content = cache::read_stdin();

        let file_path = match &self.prompt_slug {
            Some(slug) => {
                let file = session.context.load_slug(slug)?;
                if let Some(extra) = &stdin_content {
                    let raw = fsutil::read_to_string(&file.path)?;
                    let combined = format!("{}\n\n{extra}", raw.trim_end());
                    fsutil::atomic_write(&file.path, &combined)?;
                    eprintln!("Appended content from stdin.");
                }
                eprintln!("Editing prompt: {slug}");
                file.path
            }
            None => {
                let project = session.require_project()?;
                if let Some(extra) = &stdin_content {
                    cache::append(&session.dirs.cache_dir, project, extra)?;
                    eprintln!("Appended content from stdin.");
                }
                if cache::load(&session.dirs.cache_dir, project)?.is_none() {
                    cache::save(&session.dirs.cache_dir, project, "")?;
                }
                eprintln!("Editing current one-off prompt for project: {project}");
                cache::cache_file_path(&session.dirs.cache_dir, project)
            }
        };

        crate::editor::edit_with_help(&file_path, &session.editor_help()?)?;
        eprintln!("Prompt saved.");
        Ok(())
    }
}
