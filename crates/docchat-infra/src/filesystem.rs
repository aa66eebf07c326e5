//! Data directory layout.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "DOCCHAT_DATA_DIR";

/// File holding persisted tokens when the file store is used.
pub const TOKENS_FILE: &str = "tokens.json";

/// Resolve the data directory.
///
/// Priority:
/// 1. `DOCCHAT_DATA_DIR` environment variable
/// 2. `~/.docchat`
/// 3. `.docchat` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".docchat");
    }

    PathBuf::from(".docchat")
}

pub fn tokens_path(data_dir: &Path) -> PathBuf {
    data_dir.join(TOKENS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_path_is_inside_data_dir() {
        let path = tokens_path(Path::new("/tmp/docchat-test"));
        assert_eq!(path, PathBuf::from("/tmp/docchat-test/tokens.json"));
    }

    #[test]
    fn resolved_dir_is_never_empty() {
        assert!(!resolve_data_dir().as_os_str().is_empty());
    }
}
