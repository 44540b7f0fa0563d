//! Prompy CLI entry point.
//!
//! Parses arguments, configures logging, runs the selected command, and
//! turns engine errors into the multi-line diagnostics users see.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use prompy::cli::Cli;
use prompy::core::{render_diagnostic, PrompyError};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "prompy=debug" } else { "prompy=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.execute() {
        match err.downcast_ref::<PrompyError>() {
            Some(engine_err) => {
                let diagnostic = render_diagnostic(engine_err);
                let mut lines = diagnostic.lines();
                if let Some(first) = lines.next() {
                    eprintln!("{}", first.red().bold());
                }
                for line in lines {
                    eprintln!("{line}");
                }
            }
            None => {
                eprintln!("{} {err:#}", "Error:".red().bold());
            }
        }
        std::process::exit(1);
    }
}
