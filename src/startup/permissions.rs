//! Start-up permission checks.

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::fs::DataDir;
use crate::platform::accessibility_granted;

/// The data directory must accept new files, and on macOS the
/// accessibility grant must be in place for window-state capture.
pub fn check_permissions(data_dir: &DataDir) -> Result<()> {
    NamedTempFile::new_in(data_dir.root()).map_err(|e| {
        Error::Permission(format!(
            "data directory {} is not writable: {e}",
            data_dir.root().display()
        ))
    })?;

    if !accessibility_granted() {
        return Err(Error::Permission(
            "Accessibility access is needed to read window states. Grant it under \
             System Settings > Privacy & Security > Accessibility"
                .to_string(),
        ));
    }
    tracing::debug!("permissions verified");
    Ok(())
}
