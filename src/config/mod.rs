//! Configuration directory layout and environment detection.
//!
//! Prompy stores user-level prompts and settings under a single
//! configuration directory, `~/.config/prompy` by default:
//!
//! ```text
//! ~/.config/prompy/
//! ├── prompts/
//! │   ├── fragments/
//! │   ├── projects/<project>/
//! │   └── languages/<language>/
//! ├── cache/<project>/CURRENT_FILE.md
//! └── detections.yaml
//! ```
//!
//! A project may additionally carry a `.prompy/` directory at its root with
//! the same `fragments`/`projects`/`languages` layout; it takes precedence
//! over the user tree.
//!
//! The engine never reads environment variables; the CLI resolves the
//! override and passes an explicit path down.

pub mod detection;

use std::path::{Path, PathBuf};

use crate::constants::{
    CACHE_FILE_NAME, FRAGMENTS_SUBDIR, LANGUAGES_SUBDIR, PROJECT_PROMPTS_DIR, PROJECTS_SUBDIR,
};
use crate::core::error::{PrompyError, Result};
use crate::utils::fs as fsutil;

/// Resolved configuration paths.
#[derive(Debug, Clone)]
pub struct ConfigDirs {
    pub config_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub detections_file: PathBuf,
}

impl ConfigDirs {
    /// Resolve the layout under `override_dir`, or the platform config
    /// directory when none is given.
    pub fn locate(override_dir: Option<PathBuf>) -> Result<Self> {
        let config_dir = match override_dir {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or_else(|| PrompyError::Io {
                    path: PathBuf::from("~"),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no configuration directory for this platform",
                    ),
                })?
                .join("prompy"),
        };
        Ok(Self {
            prompts_dir: config_dir.join("prompts"),
            cache_dir: config_dir.join("cache"),
            detections_file: config_dir.join("detections.yaml"),
            config_dir,
        })
    }

    /// Create the directory tree and seed `detections.yaml` on first run.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.prompts_dir,
            &self.prompts_dir.join(FRAGMENTS_SUBDIR),
            &self.prompts_dir.join(PROJECTS_SUBDIR),
            &self.prompts_dir.join(LANGUAGES_SUBDIR),
            &self.cache_dir,
        ] {
            fsutil::ensure_dir(dir)?;
        }
        if !self.detections_file.exists() {
            let rules = detection::default_detections();
            let rendered = serde_yaml::to_string(&rules).map_err(|err| PrompyError::Io {
                path: self.detections_file.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            })?;
            fsutil::atomic_write(&self.detections_file, &rendered)?;
        }
        Ok(())
    }

    /// Search roots in precedence order: the project-local `.prompy/` tree
    /// when it exists, then the user `prompts/` tree.
    pub fn search_roots(&self, project_root: Option<&Path>) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(2);
        if let Some(project_root) = project_root {
            let local = project_root.join(PROJECT_PROMPTS_DIR);
            if local.is_dir() {
                roots.push(local);
            }
        }
        roots.push(self.prompts_dir.clone());
        roots
    }

    /// Path of the one-off prompt cache for a project.
    pub fn cache_file(&self, project: &str) -> PathBuf {
        self.cache_dir.join(project).join(CACHE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn ensure_creates_layout_and_seeds_detections() {
        let dir = TempDir::new().unwrap();
        let dirs = ConfigDirs::locate(Some(dir.path().join("prompy"))).unwrap();
        dirs.ensure().unwrap();

        assert!(dirs.prompts_dir.join("fragments").is_dir());
        assert!(dirs.prompts_dir.join("projects").is_dir());
        assert!(dirs.prompts_dir.join("languages").is_dir());
        assert!(dirs.cache_dir.is_dir());

        let seeded = fs::read_to_string(&dirs.detections_file).unwrap();
        assert!(seeded.contains("python:"));
        assert!(seeded.contains("file_patterns:"));
    }

    #[test]
    fn ensure_does_not_overwrite_existing_detections() {
        let dir = TempDir::new().unwrap();
        let dirs = ConfigDirs::locate(Some(dir.path().to_path_buf())).unwrap();
        dirs.ensure().unwrap();
        fs::write(&dirs.detections_file, "custom: {}\n").unwrap();
        dirs.ensure().unwrap();
        assert_eq!(
            fs::read_to_string(&dirs.detections_file).unwrap(),
            "custom: {}\n"
        );
    }

    #[test]
    fn search_roots_prefer_the_project_tree() {
        let config = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::create_dir_all(project.path().join(".prompy")).unwrap();

        let dirs = ConfigDirs::locate(Some(config.path().to_path_buf())).unwrap();
        let roots = dirs.search_roots(Some(project.path()));
        assert_eq!(
            roots,
            vec![project.path().join(".prompy"), dirs.prompts_dir.clone()]
        );

        let without_local = dirs.search_roots(None);
        assert_eq!(without_local, vec![dirs.prompts_dir.clone()]);
    }

    #[test]
    fn cache_file_is_scoped_per_project() {
        let dirs = ConfigDirs::locate(Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(
            dirs.cache_file("my-proj"),
            PathBuf::from("/cfg/cache/my-proj/CURRENT_FILE.md")
        );
    }
}
