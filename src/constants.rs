//! Global constants used throughout the Prompy codebase.
//!
//! This module centralizes directory-layout names, file naming conventions,
//! and other literals that are used across multiple modules. Defining them
//! centrally keeps the on-disk layout discoverable in one place.

/// File extension used by all prompt files (without the leading dot).
pub const PROMPT_EXTENSION: &str = "md";

/// Directory name of the project-local prompt override tree.
///
/// When a project root contains this directory it becomes the
/// highest-precedence search root.
pub const PROJECT_PROMPTS_DIR: &str = ".prompy";

/// Subtree of a search root that holds plain fragments.
pub const FRAGMENTS_SUBDIR: &str = "fragments";

/// Subtree of a search root that holds per-project fragments.
pub const PROJECTS_SUBDIR: &str = "projects";

/// Subtree of a search root that holds per-language fragments.
pub const LANGUAGES_SUBDIR: &str = "languages";

/// Slug recorded on the synthetic top-of-render resolution frame.
pub const TOP_FRAME_SLUG: &str = "<top>";

/// Name of the reserved template function that fragment references
/// compile into during preprocessing.
pub const INCLUDE_FUNCTION: &str = "include_fragment";

/// Environment variable that overrides the configuration directory.
///
/// Read by the CLI layer only; the engine never touches the environment.
pub const CONFIG_DIR_ENV: &str = "PROMPY_CONFIG_DIR";

/// File name of the per-project one-off prompt cache.
pub const CACHE_FILE_NAME: &str = "CURRENT_FILE.md";
