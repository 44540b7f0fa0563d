//! Safe file system helpers.
//!
//! All writes performed by the rename refactorer and the CLI go through
//! [`atomic_write`], which stages content in a sibling temporary file and
//! renames it into place so a file is never observed half-written.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::error::{PrompyError, Result};

/// Read a prompt file as UTF-8, mapping failures to [`PrompyError::Io`].
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| PrompyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Create a directory and all of its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| PrompyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a string to a file atomically.
///
/// The content is written to `<path>.tmp` in the same directory, synced, and
/// renamed over the destination. The file either contains the old content or
/// the new content; never a mix. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let io_err = |source: std::io::Error| PrompyError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_path);

    {
        let mut file = fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(content.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }

    fs::rename(&temp_path, path).map_err(io_err)
}
