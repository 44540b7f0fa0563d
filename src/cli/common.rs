//! Shared session setup and small interaction helpers.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::catalog::{self, HelpTextOptions, ListFilters};
use crate::config::detection::{detect_language, find_project_root, load_detections};
use crate::config::ConfigDirs;
use crate::constants::CONFIG_DIR_ENV;
use crate::context::PromptContext;

/// Everything a command needs: resolved directories, detected names, and
/// the prompt context built from them.
#[derive(Debug)]
pub struct Session {
    pub dirs: ConfigDirs,
    pub project: Option<String>,
    pub project_root: Option<PathBuf>,
    pub language: Option<String>,
    pub context: PromptContext,
}

impl Session {
    /// Resolve configuration, detect the project and language, and build
    /// the search roots.
    pub fn build(cli: &super::Cli) -> Result<Self> {
        let override_dir = std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from);
        let dirs = ConfigDirs::locate(override_dir)?;
        dirs.ensure()?;

        // An explicit --project detaches the session from the working
        // directory, so the local .prompy tree is skipped too.
        let project_root = if cli.project.is_none() {
            std::env::current_dir()
                .ok()
                .and_then(|cwd| find_project_root(&cwd))
        } else {
            None
        };
        let project = cli.project.clone().or_else(|| {
            project_root
                .as_deref()
                .and_then(|root| root.file_name())
                .map(|name| name.to_string_lossy().into_owned())
        });

        let language = match cli.language.clone() {
            Some(language) => Some(language),
            None => {
                let rules = load_detections(&dirs.detections_file);
                let scan_dir = project_root
                    .clone()
                    .or_else(|| std::env::current_dir().ok());
                scan_dir.and_then(|dir| detect_language(&dir, &rules))
            }
        };
        tracing::debug!("session: project={project:?} language={language:?}");

        let roots = dirs.search_roots(if cli.global {
            None
        } else {
            project_root.as_deref()
        });
        let context = PromptContext::new(project.clone(), language.clone(), roots);

        Ok(Self {
            dirs,
            project,
            project_root,
            language,
            context,
        })
    }

    /// The project name, or a helpful error for commands that need one.
    pub fn require_project(&self) -> Result<&str> {
        self.project.as_deref().context(
            "no project detected; run inside a project directory or pass --project",
        )
    }

    /// Help text describing every available fragment, for editor comments.
    pub fn editor_help(&self) -> Result<String> {
        let catalog = catalog::list_fragments(&self.context, &ListFilters::default())?;
        Ok(catalog::help_text(
            &self.context,
            &catalog,
            &HelpTextOptions::default(),
        ))
    }
}

/// Ask a yes/no question on the terminal; defaults to no.
pub fn confirm(question: &str) -> Result<bool> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{question} [y/N] ").context("writing prompt")?;
    stderr.flush().context("flushing prompt")?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
