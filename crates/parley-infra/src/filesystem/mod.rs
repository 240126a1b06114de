//! Filesystem layout for Parley's data directory.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   parley.db
//!   characters/{id}.toml
//! ```

pub mod character;

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley` under the user's home directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }

    // Last resort: current directory
    PathBuf::from(".parley")
}

/// Directory holding character definitions: `{data_dir}/characters/`.
pub fn characters_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("characters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characters_dir_layout() {
        let dir = characters_dir(Path::new("/srv/parley"));
        assert_eq!(dir, PathBuf::from("/srv/parley/characters"));
    }

    #[test]
    fn test_resolve_data_dir_is_not_empty() {
        let dir = resolve_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
