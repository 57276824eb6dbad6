//! Platform-specific locations used by jbup

use std::path::PathBuf;

/// Name of the per-user jbup directory
pub const APP_DIR: &str = "jbup";

/// Directory holding `jbup.toml` and the log file.
///
/// `~/.config/jbup` on Unix/macOS, the platform config dir on Windows.
pub fn config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir().map_or_else(
            || PathBuf::from(".config").join(APP_DIR),
            |h| h.join(".config").join(APP_DIR),
        )
    }

    #[cfg(target_os = "windows")]
    {
        dirs::config_dir().map_or_else(|| PathBuf::from(APP_DIR), |c| c.join(APP_DIR))
    }
}

/// Expand a leading `~` to the home directory.
///
/// `~user` forms are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }

    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
