//! Tokens persisted as JSON in the data directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use docchat_core::token::TokenStore;
use docchat_types::auth::TokenPair;
use docchat_types::error::TokenStoreError;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::filesystem::tokens_path;

#[derive(Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// `tokens.json` store. The file is kept owner-only on unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(tokens_path(data_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_private(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on create; tighten a file left behind looser.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(contents)?;
        file.sync_all()
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TokenStoreError::Io(format!("{}: {e}", self.path.display()))),
        };
        let stored: StoredTokens = serde_json::from_str(&content)
            .map_err(|e| TokenStoreError::Corrupt(format!("{}: {e}", self.path.display())))?;
        Ok(Some(TokenPair::new(stored.access_token, stored.refresh_token)))
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        let stored = StoredTokens {
            access_token: tokens.access_token.expose_secret().to_string(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
        };
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;
        self.write_private(&json)
            .map_err(|e| TokenStoreError::Io(format!("{}: {e}", self.path.display())))?;
        tracing::debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TokenStoreError::Io(format!("{}: {e}", self.path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());

        store
            .save(&TokenPair::new("access-1", Some("refresh-1".to_string())))
            .unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.access_token.expose_secret(), "access-1");
        assert_eq!(loaded.refresh_token.unwrap().expose_secret(), "refresh-1");
    }

    #[test]
    fn missing_file_means_logged_out() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn creates_missing_data_dir() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(&dir.path().join("nested").join("docchat"));

        store.save(&TokenPair::new("a", None)).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn rotate_rewrites_file() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        store
            .save(&TokenPair::new("old", Some("refresh".to_string())))
            .unwrap();

        store.rotate("new", None).unwrap();

        let reopened = FileTokenStore::in_data_dir(dir.path());
        assert_eq!(reopened.access_token().unwrap().unwrap().expose_secret(), "new");
        assert_eq!(reopened.refresh_token().unwrap().unwrap().expose_secret(), "refresh");
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(TokenStoreError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        store.save(&TokenPair::new("a", None)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn existing_loose_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        fs::write(store.path(), "{}").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&TokenPair::new("a", None)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::in_data_dir(dir.path());
        store.save(&TokenPair::new("a", None)).unwrap();

        store.clear().unwrap();

        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }
}
