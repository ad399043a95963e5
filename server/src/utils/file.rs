//! Path utility functions

use std::path::{Path, PathBuf};

/// Expand a user-supplied path to an absolute path
///
/// `~` and `~/...` resolve against the home directory. Relative paths and
/// bare names resolve against the current directory. Absolute paths pass
/// through unchanged.
///
/// ```text
/// expand_path("~/.coachyard/coachyard.db") // -> /home/user/.coachyard/coachyard.db
/// expand_path("yard.db")                   // -> /current/dir/yard.db
/// expand_path("/srv/coachyard.db")         // -> /srv/coachyard.db
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Create the parent directory of a file path if it is missing
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
