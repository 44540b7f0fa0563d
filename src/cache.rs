//! One-off prompt cache.
//!
//! Each project gets a single scratch prompt at
//! `<cache-dir>/<project>/CURRENT_FILE.md`. The `new`, `edit`, `out`, and
//! `save` commands all operate on this file until the prompt is promoted to
//! a reusable fragment.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use crate::constants::CACHE_FILE_NAME;
use crate::core::error::{PrompyError, Result};
use crate::utils::fs as fsutil;

/// Path of a project's cache file.
pub fn cache_file_path(cache_dir: &Path, project: &str) -> PathBuf {
    cache_dir.join(project).join(CACHE_FILE_NAME)
}

/// Load the cached prompt, or `None` when the project has none yet.
pub fn load(cache_dir: &Path, project: &str) -> Result<Option<String>> {
    let path = cache_file_path(cache_dir, project);
    if !path.is_file() {
        return Ok(None);
    }
    fsutil::read_to_string(&path).map(Some)
}

/// Replace the cached prompt.
pub fn save(cache_dir: &Path, project: &str, content: &str) -> Result<PathBuf> {
    let path = cache_file_path(cache_dir, project);
    fsutil::atomic_write(&path, content)?;
    Ok(path)
}

/// Append a block to the cached prompt, separated by a blank line.
pub fn append(cache_dir: &Path, project: &str, content: &str) -> Result<PathBuf> {
    let combined = match load(cache_dir, project)? {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{}\n\n{content}", existing.trim_end())
        }
        _ => content.to_string(),
    };
    save(cache_dir, project, &combined)
}

/// Remove the cached prompt; succeeds when there is nothing to clear.
pub fn clear(cache_dir: &Path, project: &str) -> Result<()> {
    let path = cache_file_path(cache_dir, project);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PrompyError::Io { path, source }),
    }
}

/// Read piped stdin, or `None` when stdin is a terminal.
pub fn read_stdin() -> Option<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut content = String::new();
    stdin.read_to_string(&mut content).ok()?;
    Some(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_returns_none_before_first_save() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load(dir.path(), "proj").unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), "proj", "the prompt\n").unwrap();
        assert_eq!(
            load(dir.path(), "proj").unwrap().as_deref(),
            Some("the prompt\n")
        );
    }

    #[test]
    fn append_separates_blocks_with_a_blank_line() {
        let dir = TempDir::new().unwrap();
        append(dir.path(), "proj", "first").unwrap();
        append(dir.path(), "proj", "second").unwrap();
        assert_eq!(
            load(dir.path(), "proj").unwrap().as_deref(),
            Some("first\n\nsecond")
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        clear(dir.path(), "proj").unwrap();
        save(dir.path(), "proj", "x").unwrap();
        clear(dir.path(), "proj").unwrap();
        assert_eq!(load(dir.path(), "proj").unwrap(), None);
    }

    #[test]
    fn projects_do_not_share_caches() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), "one", "a").unwrap();
        save(dir.path(), "two", "b").unwrap();
        assert_eq!(load(dir.path(), "one").unwrap().as_deref(), Some("a"));
        assert_eq!(load(dir.path(), "two").unwrap().as_deref(), Some("b"));
    }
}
