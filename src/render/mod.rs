//! Template evaluation and recursive fragment resolution.
//!
//! The engine layers the fragment-reference operator on top of a
//! general-purpose template language (Tera). [`preprocess`] lowers
//! `@slug(...)` tokens into calls of a reserved function; the
//! [`FragmentResolver`] registers that function, tracks a resolution stack
//! for cycle detection, and recursively renders referenced fragment bodies
//! under fresh, isolated scopes.
//!
//! [`preprocess`]: crate::reference::preprocess

pub mod renderer;
pub mod resolver;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::context::PromptContext;
use crate::core::error::Result;

pub use resolver::{FragmentResolver, ResolutionFrame};

/// Render a template body to its fully expanded text.
///
/// This is the whole resolve pipeline behind one call: references are
/// located across `roots` (highest precedence first), loaded, argument
/// contracts enforced, and expansions substituted in source order. The
/// first error terminates the render.
///
/// `scope` seeds the variables visible to the top-level body only;
/// referenced fragments see exactly their call arguments and defaults.
pub fn render(
    body: &str,
    scope: &HashMap<String, String>,
    project: Option<&str>,
    language: Option<&str>,
    roots: &[PathBuf],
) -> Result<String> {
    let context = PromptContext::new(
        project.map(String::from),
        language.map(String::from),
        roots.to_vec(),
    );
    FragmentResolver::new(context).render(body, scope)
}
