//! Editor invocation for interactive prompt editing.
//!
//! Spawns the user's editor (`$EDITOR`, then `$VISUAL`, then the first
//! common editor found on `PATH`, then `nano`) on a prompt file, blocking
//! until it exits. During an edit session a help comment listing the
//! available fragments is appended to the file and stripped back out of
//! whatever the user saved.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

const HELP_BEGIN: &str = "<!-- PROMPY-HELP";
const HELP_END: &str = "PROMPY-HELP -->";

/// Editors probed on `PATH` when neither environment variable is set.
const COMMON_EDITORS: &[&str] = &["nano", "vim", "emacs", "vi"];

/// The editor command to launch.
///
/// Checks `$EDITOR` first, then `$VISUAL`, then looks for a common editor
/// on `PATH`, and finally falls back to `nano`.
pub fn find_editor() -> String {
    for variable in ["EDITOR", "VISUAL"] {
        if let Some(editor) = std::env::var(variable)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            return editor;
        }
    }
    for candidate in COMMON_EDITORS {
        if is_on_path(candidate) {
            return (*candidate).to_string();
        }
    }
    "nano".to_string()
}

fn is_on_path(program: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| on_search_path(program, &paths))
}

fn on_search_path(program: &str, paths: &OsStr) -> bool {
    std::env::split_paths(paths).any(|dir| dir.join(program).is_file())
}

/// Launch the editor on a file and wait for it to exit.
pub fn launch_editor(path: &Path) -> Result<()> {
    let editor = find_editor();
    tracing::debug!("launching editor: {editor} {}", path.display());

    // Editors are commonly configured with flags ("code --wait").
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("editor command is empty")?;
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("failed to launch editor '{editor}'"))?;
    if !status.success() {
        bail!("editor '{editor}' exited with {status}");
    }
    Ok(())
}

/// Edit a file with a fragment help comment appended.
///
/// The help block is wrapped in HTML comment markers, written to the file
/// before launching the editor, and removed from the saved content
/// afterwards so it never leaks into rendered output.
pub fn edit_with_help(path: &Path, help: &str) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };

    let with_help = format!(
        "{}\n\n{HELP_BEGIN}\n{}\nThis comment section will be removed from the final prompt.\n{HELP_END}\n",
        existing.trim_end(),
        help.trim_end(),
    );
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, &with_help).with_context(|| format!("writing {}", path.display()))?;

    launch_editor(path)?;

    let edited =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cleaned = strip_help(&edited);
    std::fs::write(path, cleaned).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Remove the help comment block, tolerating user edits around it.
pub fn strip_help(content: &str) -> String {
    let Some(begin) = content.find(HELP_BEGIN) else {
        return content.to_string();
    };
    let after_begin = begin + HELP_BEGIN.len();
    let end = content[after_begin..]
        .find(HELP_END)
        .map_or(content.len(), |i| after_begin + i + HELP_END.len());

    let mut out = String::with_capacity(content.len());
    out.push_str(content[..begin].trim_end());
    let tail = content[end..].trim_start();
    if !tail.is_empty() {
        out.push_str("\n\n");
        out.push_str(tail);
    } else {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_help_removes_the_comment_block() {
        let content = format!(
            "My prompt body.\n\n{HELP_BEGIN}\nFRAGMENTS:\n  @a\n{HELP_END}\n"
        );
        assert_eq!(strip_help(&content), "My prompt body.\n");
    }

    #[test]
    fn strip_help_keeps_text_after_the_block() {
        let content = format!("Before.\n\n{HELP_BEGIN}\nhelp\n{HELP_END}\n\nAfter.\n");
        assert_eq!(strip_help(&content), "Before.\n\nAfter.\n");
    }

    #[test]
    fn strip_help_is_a_no_op_without_markers() {
        assert_eq!(strip_help("plain\n"), "plain\n");
    }

    #[test]
    fn strip_help_handles_a_deleted_end_marker() {
        let content = format!("Body.\n{HELP_BEGIN}\ntruncated");
        assert_eq!(strip_help(&content), "Body.\n");
    }

    #[test]
    fn path_probe_finds_only_existing_programs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("vim"), "").unwrap();
        let paths = std::env::join_paths([dir.path()]).unwrap();

        assert!(on_search_path("vim", &paths));
        assert!(!on_search_path("emacs", &paths));
    }
}
