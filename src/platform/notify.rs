//! Default [`Notifier`]s.
//!
//! [`ConsoleNotifier`] is used by interactive commands. The daemon has no
//! terminal, so it uses [`LogNotifier`], which also raises a desktop
//! notification for errors.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::process::Command;

use super::Notifier;

#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier {
    /// Answer every confirmation with yes instead of prompting
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assume_yes(mut self) -> Self {
        self.assume_yes = true;
        self
    }
}

impl Notifier for ConsoleNotifier {
    fn info(&self, title: &str, message: &str) {
        println!("{} {}: {message}", "✓".green().bold(), title.bold());
    }

    fn error(&self, title: &str, message: &str) {
        eprintln!("{} {}: {message}", "✗".red().bold(), title.bold());
    }

    fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} {}: {message} [y/N] ", "?".yellow().bold(), title.bold());
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogNotifier {
    /// Answer returned by [`Notifier::confirm`]
    default_answer: bool,
}

impl LogNotifier {
    pub fn new(default_answer: bool) -> Self {
        Self { default_answer }
    }
}

impl Notifier for LogNotifier {
    fn info(&self, title: &str, message: &str) {
        tracing::info!(title, message, "notification");
    }

    fn error(&self, title: &str, message: &str) {
        tracing::error!(title, message, "notification");
        if let Err(e) = send_desktop_notification(title, message) {
            tracing::debug!(error = %e, "desktop notification failed");
        }
    }

    fn confirm(&self, title: &str, message: &str) -> bool {
        tracing::info!(title, message, answer = self.default_answer, "confirmation answered without prompt");
        self.default_answer
    }
}

/// Best-effort desktop notification via `osascript` or `notify-send`.
fn send_desktop_notification(title: &str, body: &str) -> Result<(), String> {
    let mut command = if cfg!(target_os = "macos") {
        let script = format!(
            "display notification {} with title {}",
            super::applescript::quote(body),
            super::applescript::quote(title)
        );
        let mut command = Command::new("osascript");
        command.arg("-e").arg(script);
        command
    } else {
        let mut command = Command::new("notify-send");
        command.arg("--app-name=relaunch").arg(title).arg(body);
        command
    };

    let output = command.output().map_err(|e| format!("spawn failed: {e}"))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!("exited with: {}", output.status))
    }
}
