//! Start a fresh one-off prompt.

use anyhow::Result;
use clap::Args;

use super::common::Session;
use crate::cache;

/// Create a new prompt and open it in the editor.
///
/// With a `PROMPT_SLUG` argument the new prompt starts from that
/// fragment's body; with piped stdin it starts from the piped content;
/// otherwise it starts empty. `--save` promotes the result to a reusable
/// fragment in one step.
#[derive(Debug, Args)]
pub struct NewCommand {
    /// Fragment to use as the starting template.
    prompt_slug: Option<String>,

    /// Save the edited prompt under this slug when the editor closes.
    #[arg(long, value_name = "SLUG")]
    save: Option<String>,
}

impl NewCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let project = session.require_project()?;
        cache::clear(&session.dirs.cache_dir, project)?;

        let initial = match cache::read_stdin() {
            Some(content) => {
                eprintln!("Read initial content from stdin.");
                content
            }
            None => match &self.prompt_slug {
                Some(slug) => session.context.load_slug(slug)?.body,
                None => String::new(),
            },
        };
        let cache_file = cache::save(&session.dirs.cache_dir, project, &initial)?;

        crate::editor::edit_with_help(&cache_file, &session.editor_help()?)?;
        eprintln!("New prompt cached for {project}.");

        if let Some(save_as) = &self.save {
            super::save::SaveCommand::plain(save_as).execute(session)?;
        }
        Ok(())
    }
}
