//! Project root discovery and language detection.
//!
//! Detection is heuristic and deliberately cheap: file-name patterns count
//! once, directory patterns count triple, and content patterns from a small
//! sample of files break near-ties. Rules live in `detections.yaml` and
//! follow the shape:
//!
//! ```yaml
//! rust:
//!   file_patterns: ["*.rs", "Cargo.toml"]
//!   dir_patterns: ["target/debug"]
//!   content_patterns: ["fn ", "impl "]
//!   weight: 1.0
//! ```
//!
//! The engine receives only the resulting `project` and `language` strings;
//! everything in this module runs in the CLI layer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Per-language detection rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    #[serde(default)]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub dir_patterns: Vec<String>,
    #[serde(default)]
    pub content_patterns: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Rules keyed by language name; ordered for deterministic output.
pub type DetectionRules = BTreeMap<String, DetectionRule>;

/// Files or directories that mark a project root.
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "pyproject.toml",
    "setup.py",
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "Gemfile",
    "composer.json",
    "CMakeLists.txt",
];

/// Languages preferred when scores land within ten percent of each other.
const PRIORITY_LANGUAGES: &[&str] = &[
    "typescript",
    "python",
    "javascript",
    "java",
    "rust",
    "go",
    "ruby",
    "c",
    "cpp",
];

/// How many files are sampled for content-pattern matching.
const SAMPLE_FILES_LIMIT: usize = 10;

/// How much of each sampled file is read, in bytes.
const SAMPLE_BYTES: usize = 5 * 1024;

/// Upper bound on directory entries visited during one detection pass.
const WALK_LIMIT: usize = 10_000;

/// Walk upward from `start` looking for a project marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        for marker in PROJECT_MARKERS {
            if dir.join(marker).exists() {
                tracing::debug!("found project root {} via {marker}", dir.display());
                return Some(dir.to_path_buf());
            }
        }
        current = dir.parent();
    }
    None
}

/// Load detection rules, falling back to the defaults on any problem.
pub fn load_detections(path: &Path) -> DetectionRules {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_yaml::from_str(&raw) {
            Ok(rules) => rules,
            Err(err) => {
                tracing::warn!("invalid detections file {}: {err}", path.display());
                default_detections()
            }
        },
        Err(_) => default_detections(),
    }
}

/// Validate a detections file, returning every problem found.
pub fn validate_detections(path: &Path) -> Result<DetectionRules, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    serde_yaml::from_str(&raw).map_err(|err| format!("invalid detection rules: {err}"))
}

/// Score every configured language against a project tree.
///
/// Returns `None` when nothing matches at all.
pub fn detect_language(project_dir: &Path, rules: &DetectionRules) -> Option<String> {
    let mut scores: BTreeMap<&str, f64> = rules.keys().map(|k| (k.as_str(), 0.0)).collect();
    let mut sample_files: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(project_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker.flatten().take(WALK_LIMIT) {
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() {
            for (language, rule) in rules {
                let matched = rule
                    .file_patterns
                    .iter()
                    .any(|pattern| wildcard_match(&name, pattern));
                if matched {
                    *scores.get_mut(language.as_str()).expect("initialized") += rule.weight;
                    if sample_files.len() < SAMPLE_FILES_LIMIT {
                        sample_files.push(entry.path().to_path_buf());
                    }
                }
            }
        } else if entry.file_type().is_dir() {
            for (language, rule) in rules {
                let matched = rule.dir_patterns.iter().any(|pattern| {
                    if pattern.contains('/') {
                        entry.path().to_string_lossy().ends_with(pattern)
                    } else {
                        wildcard_match(&name, pattern)
                    }
                });
                if matched {
                    *scores.get_mut(language.as_str()).expect("initialized") += 3.0 * rule.weight;
                }
            }
        }
    }

    let had_file_matches = scores.values().any(|score| *score > 0.0);
    let content_weight = if had_file_matches { 0.5 } else { 1.0 };
    for file in &sample_files {
        let Ok(bytes) = std::fs::read(file) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes[..bytes.len().min(SAMPLE_BYTES)]).into_owned();
        for (language, rule) in rules {
            let occurrences: usize = rule
                .content_patterns
                .iter()
                .map(|pattern| content.matches(pattern.as_str()).count())
                .sum();
            if occurrences > 0 {
                *scores.get_mut(language.as_str()).expect("initialized") +=
                    occurrences as f64 * content_weight * rule.weight;
            }
        }
    }

    let max_score = scores.values().cloned().fold(0.0_f64, f64::max);
    if max_score == 0.0 {
        return None;
    }

    let threshold = max_score * 0.9;
    let top: Vec<&str> = scores
        .iter()
        .filter(|(_, score)| **score >= threshold)
        .map(|(language, _)| *language)
        .collect();
    tracing::debug!("language scores: {scores:?}, top candidates: {top:?}");

    for preferred in PRIORITY_LANGUAGES {
        if top.contains(preferred) {
            return Some((*preferred).to_string());
        }
    }
    scores
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).expect("scores are finite"))
        .map(|(language, _)| (*language).to_string())
}

/// Match a file name against a `*`-wildcard pattern.
fn wildcard_match(name: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return name == pattern;
    }
    let mut remainder = name;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if index == 0 {
            match remainder.strip_prefix(part) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if index == parts.len() - 1 {
            return remainder.ends_with(part);
        } else {
            match remainder.find(part) {
                Some(found) => remainder = &remainder[found + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// The detection rules seeded into a fresh configuration directory.
pub fn default_detections() -> DetectionRules {
    let rule = |files: &[&str], dirs: &[&str], contents: &[&str], weight: f64| DetectionRule {
        file_patterns: files.iter().map(|s| s.to_string()).collect(),
        dir_patterns: dirs.iter().map(|s| s.to_string()).collect(),
        content_patterns: contents.iter().map(|s| s.to_string()).collect(),
        weight,
    };

    BTreeMap::from([
        (
            "python".to_string(),
            rule(
                &["*.py", "requirements.txt", "pyproject.toml", "Pipfile", "*.ipynb"],
                &[".venv", "venv", "__pycache__"],
                &["import ", "from ", "def ", "class "],
                1.0,
            ),
        ),
        (
            "javascript".to_string(),
            rule(
                &["*.js", "*.jsx", "package.json", ".eslintrc*", "webpack.config.js"],
                &["node_modules"],
                &["import ", "export ", "const ", "require("],
                1.0,
            ),
        ),
        (
            "typescript".to_string(),
            rule(
                &["*.ts", "*.tsx", "tsconfig.json"],
                &["node_modules/@types"],
                &["interface ", "type ", "namespace ", "export "],
                1.2,
            ),
        ),
        (
            "rust".to_string(),
            rule(
                &["*.rs", "Cargo.toml", "Cargo.lock"],
                &["target/debug", "target/release"],
                &["fn ", "struct ", "impl ", "use "],
                1.0,
            ),
        ),
        (
            "go".to_string(),
            rule(
                &["*.go", "go.mod", "go.sum"],
                &["vendor"],
                &["package ", "func ", "type "],
                1.0,
            ),
        ),
        (
            "java".to_string(),
            rule(
                &["*.java", "pom.xml", "build.gradle"],
                &["src/main/java", "src/test/java"],
                &["public class ", "import java.", "package "],
                1.0,
            ),
        ),
        (
            "ruby".to_string(),
            rule(
                &["*.rb", "Gemfile", "Rakefile", "*.gemspec"],
                &["vendor/bundle"],
                &["require ", "def ", "module ", "gem "],
                1.0,
            ),
        ),
        (
            "c".to_string(),
            rule(
                &["*.c", "Makefile"],
                &[],
                &["#include ", "int ", "typedef "],
                1.0,
            ),
        ),
        (
            "cpp".to_string(),
            rule(
                &["*.cpp", "*.hpp", "*.cc", "CMakeLists.txt"],
                &[],
                &["#include ", "namespace ", "std::", "template"],
                1.0,
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("main.rs", "*.rs"));
        assert!(wildcard_match("Cargo.toml", "Cargo.toml"));
        assert!(wildcard_match(".eslintrc.json", ".eslintrc*"));
        assert!(!wildcard_match("main.rss", "*.rs"));
        assert!(!wildcard_match("main.py", "*.rs"));
    }

    #[test]
    fn project_root_found_by_marker_upward() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();

        let found = find_project_root(&dir.path().join("src/deep")).unwrap();
        assert_eq!(fs::canonicalize(found).unwrap(), fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn detects_rust_from_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();

        let detected = detect_language(dir.path(), &default_detections());
        assert_eq!(detected.as_deref(), Some("rust"));
    }

    #[test]
    fn empty_tree_detects_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_language(dir.path(), &default_detections()), None);
    }

    #[test]
    fn typescript_outranks_javascript_on_priority_ties() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "const x = 1\n").unwrap();
        fs::write(dir.path().join("a.ts"), "export interface X {}\n").unwrap();

        let detected = detect_language(dir.path(), &default_detections());
        assert_eq!(detected.as_deref(), Some("typescript"));
    }

    #[test]
    fn custom_rules_round_trip_through_yaml() {
        let rules = default_detections();
        let rendered = serde_yaml::to_string(&rules).unwrap();
        let parsed: DetectionRules = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), rules.len());
        assert_eq!(parsed["typescript"].weight, 1.2);
    }
}
