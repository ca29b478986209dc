//! Shared path helpers used by the CLI and the health check.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable overriding the privacy settings location.
pub const SETTINGS_PATH_ENV: &str = "MUSANNIF_SETTINGS";

/// Gets the privacy settings path.
///
/// Uses `MUSANNIF_SETTINGS` when set, otherwise
/// `{config_dir}/musannif/privacy_settings.json` where `config_dir` is:
/// - Linux: `~/.config`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the configuration directory cannot be determined.
pub fn get_settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Failed to determine configuration directory"))?;

    Ok(config_dir.join("musannif").join("privacy_settings.json"))
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
