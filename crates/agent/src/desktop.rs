// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default desktop collaborators backed by host commands.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::{debug, info};

use crate::delivery::{Clipboard, Notifier, Toast, ToastDuration};

const APP_NAME: &str = "hookcast";

// -- Toasts -------------------------------------------------------------------

/// Which host tool renders toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastCommand {
    /// freedesktop `notify-send`.
    NotifySend,
    /// macOS `osascript -e 'display notification ...'`.
    Osascript,
}

impl ToastCommand {
    pub fn for_host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Osascript
        } else {
            Self::NotifySend
        }
    }
}

/// Renders toasts by running a host command per notification.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: ToastCommand,
}

impl CommandNotifier {
    pub fn new(command: ToastCommand) -> Self {
        Self { command }
    }

    pub fn for_host() -> Self {
        Self::new(ToastCommand::for_host())
    }

    pub(crate) fn build(&self, toast: &Toast) -> Command {
        match self.command {
            ToastCommand::NotifySend => {
                let expire_ms = match toast.duration {
                    ToastDuration::Short => "5000",
                    ToastDuration::Long => "25000",
                };
                let mut cmd = Command::new("notify-send");
                cmd.arg(format!("--app-name={APP_NAME}"))
                    .args(["--expire-time", expire_ms])
                    .arg("--")
                    .arg(&toast.title)
                    .arg(&toast.body);
                cmd
            }
            ToastCommand::Osascript => {
                let script = format!(
                    "display notification {} with title {}",
                    applescript_string(&toast.body),
                    applescript_string(&toast.title)
                );
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(script);
                cmd
            }
        }
    }
}

impl Notifier for CommandNotifier {
    fn show(&self, toast: &Toast) -> anyhow::Result<()> {
        let mut cmd = self.build(toast);
        let program = format!("{:?}", cmd.get_program());
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run {program}"))?;
        if !output.status.success() {
            anyhow::bail!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Writes toasts to the log instead of the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, toast: &Toast) -> anyhow::Result<()> {
        info!(
            title = %toast.title,
            body = %toast.body,
            duration = toast.duration.as_str(),
            "toast"
        );
        Ok(())
    }
}

// -- Clipboard ----------------------------------------------------------------

/// A clipboard writer program and its arguments; text goes to its stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self { program: program.to_owned(), args: args.iter().map(|a| (*a).to_owned()).collect() }
    }
}

/// Mirrors text to the clipboard with the first installed writer.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    candidates: Vec<ClipboardCommand>,
}

impl CommandClipboard {
    pub fn with_candidates(candidates: Vec<ClipboardCommand>) -> Self {
        Self { candidates }
    }

    /// `wl-copy`, `xclip`, `xsel`, then `pbcopy`.
    pub fn for_host() -> Self {
        Self::with_candidates(vec![
            ClipboardCommand::new("wl-copy", &[]),
            ClipboardCommand::new("xclip", &["-selection", "clipboard"]),
            ClipboardCommand::new("xsel", &["--clipboard", "--input"]),
            ClipboardCommand::new("pbcopy", &[]),
        ])
    }

    /// Feed `text` to one writer. The child is always reaped, even when it
    /// exits before reading its input.
    fn run(candidate: &ClipboardCommand, text: &str) -> anyhow::Result<()> {
        let mut child = Command::new(&candidate.program)
            .args(&candidate.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        if !status.success() {
            anyhow::bail!("{} exited with {status}", candidate.program);
        }
        written.with_context(|| format!("failed to write to {}", candidate.program))
    }
}

impl Clipboard for CommandClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        let mut last_err = None;
        for candidate in &self.candidates {
            match Self::run(candidate, text) {
                Ok(()) => return Ok(()),
                Err(e) if is_not_found(&e) => {
                    debug!(program = %candidate.program, "clipboard tool not installed");
                }
                Err(e) => {
                    debug!(program = %candidate.program, err = %format!("{e:#}"), "clipboard tool failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no clipboard tool found")))
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>().is_some_and(|io| io.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
#[path = "desktop_tests.rs"]
mod tests;
