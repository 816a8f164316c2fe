//! Login-session registration: a LaunchAgent plist on macOS, an XDG
//! autostart entry elsewhere. Enabling and disabling rewrite the entry with
//! the session manager's own "disabled" flag, so a disabled entry stays
//! installed.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::AutoStart;

pub const LAUNCH_AGENT_LABEL: &str = "io.relaunch.agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    LaunchAgent,
    XdgDesktop,
}

#[derive(Debug, Clone)]
pub struct FileAutoStart {
    kind: EntryKind,
    path: PathBuf,
}

impl FileAutoStart {
    pub fn new(kind: EntryKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    /// Entry location for the current platform and user.
    pub fn for_current_user() -> Result<Self> {
        if cfg!(target_os = "macos") {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(Self::new(
                EntryKind::LaunchAgent,
                home.join("Library/LaunchAgents")
                    .join(format!("{LAUNCH_AGENT_LABEL}.plist")),
            ))
        } else {
            let config = dirs::config_dir().context("Failed to get config directory")?;
            Ok(Self::new(
                EntryKind::XdgDesktop,
                config.join("autostart").join("relaunch.desktop"),
            ))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, executable: &Path, enabled: bool) -> String {
        let exe = executable.display();
        match self.kind {
            EntryKind::LaunchAgent => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCH_AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
        <string>start</string>
        <string>--foreground</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>Disabled</key>
    <{}/>
</dict>
</plist>
"#,
                if enabled { "false" } else { "true" }
            ),
            EntryKind::XdgDesktop => format!(
                "[Desktop Entry]\nType=Application\nName=relaunch\nComment=Restore applications after restarts\nExec=\"{exe}\" start --foreground\nNoDisplay=true\nX-GNOME-Autostart-enabled={enabled}\nHidden={}\n",
                !enabled
            ),
        }
    }

    /// Executable recorded in an installed entry
    fn installed_executable(&self) -> Result<PathBuf> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let exe = match self.kind {
            EntryKind::LaunchAgent => content
                .split("<key>ProgramArguments</key>")
                .nth(1)
                .and_then(|rest| rest.split("<string>").nth(1))
                .and_then(|rest| rest.split("</string>").next()),
            EntryKind::XdgDesktop => content
                .lines()
                .find_map(|line| line.strip_prefix("Exec=\""))
                .and_then(|rest| rest.split('"').next()),
        };
        exe.map(PathBuf::from)
            .with_context(|| format!("Malformed autostart entry: {}", self.path.display()))
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let executable = self.installed_executable()?;
        fs::write(&self.path, self.render(&executable, enabled))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), enabled, "auto-start updated");
        Ok(())
    }
}

impl AutoStart for FileAutoStart {
    fn install(&self, executable: &Path) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, self.render(executable, true))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "auto-start installed");
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    fn enable(&self) -> Result<()> {
        self.set_enabled(true)
    }

    fn disable(&self) -> Result<()> {
        self.set_enabled(false)
    }

    fn is_installed(&self) -> bool {
        self.path.exists()
    }

    fn is_enabled(&self) -> bool {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return false;
        };
        match self.kind {
            EntryKind::LaunchAgent => !content.contains("<key>Disabled</key>\n    <true/>"),
            EntryKind::XdgDesktop => content.contains("X-GNOME-Autostart-enabled=true"),
        }
    }
}
