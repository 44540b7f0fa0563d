//! Output sinks for rendered prompts.
//!
//! A rendered prompt goes to exactly one of stdout, a file, or the system
//! clipboard. Clipboard access shells out to the platform's clipboard
//! command (`pbcopy`, `wl-copy`, or `xclip`), the same way the rest of the
//! tool defers to system binaries; when none is available the content falls
//! back to stdout with a warning.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use colored::Colorize;

/// Write rendered content to the chosen sink.
pub fn output_content(content: &str, file: Option<&Path>, clipboard: bool) -> Result<()> {
    if clipboard {
        match copy_to_clipboard(content) {
            Ok(()) => {
                eprintln!("{}", "Prompt copied to clipboard.".green());
                return Ok(());
            }
            Err(err) => {
                tracing::warn!("clipboard unavailable, falling back to stdout: {err}");
            }
        }
    } else if let Some(path) = file {
        std::fs::write(path, ensure_trailing_newline(content))
            .with_context(|| format!("writing prompt to {}", path.display()))?;
        eprintln!("{}", format!("Prompt saved to {}", path.display()).green());
        return Ok(());
    }
    write_stdout(content)
}

/// Print to stdout with a single trailing newline.
pub fn write_stdout(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(ensure_trailing_newline(content).as_bytes())
        .context("writing prompt to stdout")?;
    stdout.flush().context("flushing stdout")
}

/// Pipe content into the first clipboard command that exists.
fn copy_to_clipboard(content: &str) -> Result<()> {
    let candidates: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (program, args) in candidates {
        let spawned = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(_) => continue,
        };
        child
            .stdin
            .take()
            .context("clipboard command has no stdin")?
            .write_all(content.as_bytes())
            .with_context(|| format!("piping prompt into {program}"))?;
        let status = child
            .wait()
            .with_context(|| format!("waiting for {program}"))?;
        if status.success() {
            return Ok(());
        }
        bail!("{program} exited with {status}");
    }
    bail!("no clipboard command found (tried pbcopy, wl-copy, xclip)")
}

fn ensure_trailing_newline(content: &str) -> String {
    if content.is_empty() || content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{content}\n")
    }
}
