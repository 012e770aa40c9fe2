//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "bbforge.toml";

/// Candidate config files, in lookup order: explicit path, working
/// directory, then the user config directory.
pub fn config_candidates(explicit: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut candidates = vec![cwd.join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("bbforge").join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
