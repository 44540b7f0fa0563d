//! Shared fixtures for integration tests.
//!
//! Builds throwaway prompt trees with the on-disk layout the resolver
//! expects: `fragments/`, `projects/<name>/`, and `languages/<name>/`
//! under each search root.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use prompy::{PromptContext, PrompyError};

/// One search root on disk plus the names used to resolve sigils.
pub struct PromptTree {
    root: TempDir,
    pub project: Option<String>,
    pub language: Option<String>,
}

impl PromptTree {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp prompt tree"),
            project: None,
            language: None,
        }
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project = Some(project.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write a file at a root-relative path, creating parents.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a plain fragment under `fragments/`.
    pub fn fragment(&self, slug: &str, body: &str) -> PathBuf {
        self.write(&format!("fragments/{slug}.md"), body)
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.path().join(relative)).unwrap()
    }

    pub fn context(&self) -> PromptContext {
        PromptContext::new(
            self.project.clone(),
            self.language.clone(),
            vec![self.root.path().to_path_buf()],
        )
    }

    /// Render a top-level body with an empty scope.
    pub fn render(&self, body: &str) -> Result<String, PrompyError> {
        self.render_with_scope(body, &HashMap::new())
    }

    pub fn render_with_scope(
        &self,
        body: &str,
        scope: &HashMap<String, String>,
    ) -> Result<String, PrompyError> {
        prompy::render(
            body,
            scope,
            self.project.as_deref(),
            self.language.as_deref(),
            &[self.root.path().to_path_buf()],
        )
    }
}
