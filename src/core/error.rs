//! Error types for fragment resolution and template evaluation.
//!
//! The error system is built around one principle: every failure that can be
//! traced to a location in a prompt file carries that location. A render
//! either produces a fully expanded string or exactly one [`PrompyError`];
//! nothing is recovered locally and partial output is never surfaced.
//!
//! # Error Categories
//!
//! - **Reference resolution**: [`PrompyError::MissingFragment`],
//!   [`PrompyError::Cycle`], [`PrompyError::InvalidSlug`]
//! - **Argument binding**: [`PrompyError::MissingArgument`],
//!   [`PrompyError::TooManyArguments`], [`PrompyError::UnboundVariable`]
//! - **Parsing**: [`PrompyError::Syntax`]
//! - **File system**: [`PrompyError::Io`]
//!
//! Use [`crate::core::diagnostics::render_diagnostic`] to format any of
//! these into the multi-line report shown by the CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, PrompyError>;

/// All failure modes of the fragment composition engine.
///
/// Variants carry the file path and line number of the offending reference
/// where one exists. Line numbers are 1-based and count from the top of the
/// file (frontmatter included); `line == 0` means the location is the
/// synthetic top-level body, which has no file of its own.
#[derive(Debug, Error)]
pub enum PrompyError {
    /// Malformed reference syntax or a template-language construct the host
    /// engine rejected.
    #[error("Template syntax error at line {line}: {detail}")]
    Syntax {
        detail: String,
        file: Option<PathBuf>,
        line: usize,
        /// Offending source line with a caret marker, when available.
        snippet: Option<String>,
    },

    /// A slug did not resolve to a file in any search root.
    #[error("Missing fragment: @{slug}")]
    MissingFragment {
        slug: String,
        file: Option<PathBuf>,
        line: usize,
        /// Every path that was probed, in precedence order.
        searched: Vec<PathBuf>,
    },

    /// A declared argument without a default was not bound by the caller.
    #[error("Missing required argument '{name}' for fragment @{slug}")]
    MissingArgument {
        name: String,
        slug: String,
        file: Option<PathBuf>,
        line: usize,
    },

    /// More positional arguments were passed than the fragment declares.
    #[error(
        "Too many positional arguments for fragment @{slug}: declared {declared}, got {given}"
    )]
    TooManyArguments {
        slug: String,
        declared: usize,
        given: usize,
        file: Option<PathBuf>,
        line: usize,
    },

    /// An identifier used as an argument value is absent from the caller's
    /// scope.
    #[error("Unbound variable '{name}'")]
    UnboundVariable {
        name: String,
        file: Option<PathBuf>,
        line: Option<usize>,
        /// Close matches from the caller's scope, best first.
        suggestions: Vec<String>,
    },

    /// A slug appeared twice on the resolution stack.
    #[error("Cyclic reference detected: {}", format_chain(.chain))]
    Cycle {
        /// Stack slugs from the synthetic top frame down to the repeated
        /// slug; the chain begins and ends with the same fragment.
        chain: Vec<String>,
        file: Option<PathBuf>,
        line: usize,
    },

    /// Empty, absolute, or otherwise malformed slug.
    #[error("Invalid fragment slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: String },

    /// A fragment file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination of a copy or move already exists.
    #[error("Fragment already exists: @{slug} ({path})")]
    FragmentExists { slug: String, path: PathBuf },
}

/// Joins a cycle chain as `@a -> @b -> @a` for the one-line summary.
fn format_chain(chain: &[String]) -> String {
    chain.iter().map(|s| format!("@{s}")).collect::<Vec<_>>().join(" -> ")
}

impl PrompyError {
    /// The file the error was located in, if any.
    pub fn file(&self) -> Option<&PathBuf> {
        match self {
            Self::Syntax { file, .. }
            | Self::MissingFragment { file, .. }
            | Self::MissingArgument { file, .. }
            | Self::TooManyArguments { file, .. }
            | Self::UnboundVariable { file, .. }
            | Self::Cycle { file, .. } => file.as_ref(),
            Self::Io { path, .. } | Self::FragmentExists { path, .. } => Some(path),
            Self::InvalidSlug { .. } => None,
        }
    }

    /// Attach a file path to an error that was produced before the caller's
    /// location was known. Existing locations are kept.
    pub fn with_file(mut self, new_file: PathBuf) -> Self {
        match &mut self {
            Self::Syntax { file, .. }
            | Self::MissingFragment { file, .. }
            | Self::MissingArgument { file, .. }
            | Self::TooManyArguments { file, .. }
            | Self::UnboundVariable { file, .. }
            | Self::Cycle { file, .. } => {
                if file.is_none() {
                    *file = Some(new_file);
                }
            }
            _ => {}
        }
        self
    }
}
