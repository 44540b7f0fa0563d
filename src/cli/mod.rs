//! Command-line interface for Prompy.
//!
//! Each subcommand lives in its own module with its own argument struct
//! and execution logic. All commands share the [`common::Session`] setup:
//! configuration directories, project and language detection, and the
//! resolved search roots.
//!
//! # Commands
//!
//! - `new` - Start a fresh one-off prompt and open it in the editor
//! - `edit` - Edit the current one-off prompt or a named fragment
//! - `out` - Render a prompt with all fragments expanded
//! - `pbcopy` - Render and copy to the clipboard
//! - `save` - Promote the one-off prompt to a reusable fragment
//! - `list` - List available fragments
//! - `cp` / `mv` / `rm` - Manage fragment files (`mv` rewrites references)
//! - `detections` - Edit or validate the language detection rules
//!
//! Global flags `--project` and `--language` override detection, and
//! `--global` ignores the project-local `.prompy/` tree.

pub mod common;

mod cp;
mod detections;
mod edit;
mod list;
mod mv;
mod new;
mod out;
mod rm;
mod save;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Build prompts for AI assistants from reusable Markdown fragments.
#[derive(Debug, Parser)]
#[command(name = "prompy", version, about)]
pub struct Cli {
    /// Use this project name instead of detecting one.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Use this language instead of detecting one.
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Ignore prompts stored in the project directory.
    #[arg(long, short = 'g', global = true)]
    pub global: bool,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    New(new::NewCommand),
    Edit(edit::EditCommand),
    Out(out::OutCommand),
    /// Render a prompt and copy it to the clipboard.
    Pbcopy(out::PbcopyCommand),
    Save(save::SaveCommand),
    List(list::ListCommand),
    Cp(cp::CpCommand),
    Mv(mv::MvCommand),
    Rm(rm::RmCommand),
    Detections(detections::DetectionsCommand),
}

impl Cli {
    /// Dispatch to the selected command; no command behaves like `edit`.
    pub fn execute(self) -> Result<()> {
        let session = common::Session::build(&self)?;
        match self.command {
            Some(Commands::New(cmd)) => cmd.execute(&session),
            Some(Commands::Edit(cmd)) => cmd.execute(&session),
            Some(Commands::Out(cmd)) => cmd.execute(&session),
            Some(Commands::Pbcopy(cmd)) => cmd.execute(&session),
            Some(Commands::Save(cmd)) => cmd.execute(&session),
            Some(Commands::List(cmd)) => cmd.execute(&session),
            Some(Commands::Cp(cmd)) => cmd.execute(&session),
            Some(Commands::Mv(cmd)) => cmd.execute(&session),
            Some(Commands::Rm(cmd)) => cmd.execute(&session),
            Some(Commands::Detections(cmd)) => cmd.execute(&session),
            None => edit::EditCommand::default().execute(&session),
        }
    }
}
