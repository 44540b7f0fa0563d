//! Render a prompt with every fragment expanded.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::common::Session;
use crate::cache;
use crate::fragment::PromptFile;
use crate::output;
use crate::render::FragmentResolver;

/// Output the current prompt or a named fragment, fully rendered.
#[derive(Debug, Args)]
pub struct OutCommand {
    /// Fragment to render instead of the one-off prompt.
    prompt_slug: Option<String>,

    /// Write the rendered prompt to a file.
    #[arg(long, short = 'f', value_name = "PATH")]
    file: Option<PathBuf>,

    /// Copy the rendered prompt to the clipboard.
    #[arg(long)]
    pbcopy: bool,
}

impl OutCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let rendered = render_prompt(session, self.prompt_slug.as_deref())?;
        output::output_content(&rendered, self.file.as_deref(), self.pbcopy)?;
        Ok(())
    }
}

/// Render a prompt and copy it to the clipboard.
#[derive(Debug, Args)]
pub struct PbcopyCommand {
    /// Fragment to render instead of the one-off prompt.
    prompt_slug: Option<String>,
}

impl PbcopyCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let rendered = render_prompt(session, self.prompt_slug.as_deref())?;
        output::output_content(&rendered, None, true)?;
        Ok(())
    }
}

/// Load the requested prompt (or the one-off cache) and run the resolve
/// pipeline over it.
fn render_prompt(session: &Session, slug: Option<&str>) -> Result<String> {
    let prompt = match slug {
        Some(slug) => session.context.load_slug(slug)?,
        None => {
            let project = session.require_project()?;
            let content = cache::load(&session.dirs.cache_dir, project)?
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "no current prompt; start one with 'prompy new' or pass a prompt slug"
                    )
                })?;
            PromptFile::parse(
                &content,
                &cache::cache_file_path(&session.dirs.cache_dir, project),
                "current",
            )
        }
    };

    let resolver = FragmentResolver::new(session.context.clone());
    Ok(resolver.render_file(&prompt)?)
}
