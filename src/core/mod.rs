//! Core types and error handling for Prompy.
//!
//! This module hosts the error taxonomy shared by the whole engine and the
//! diagnostic reporter that turns those errors into the multi-line messages
//! shown to users. The engine itself never prints; callers decide whether a
//! diagnostic goes to stderr, a log, or nowhere.

pub mod diagnostics;
pub mod error;

pub use diagnostics::render_diagnostic;
pub use error::{PrompyError, Result};
