//! Persisted Last.fm session key.
//!
//! `segue login` stores the key once; `segue play` loads it so scrobbles and
//! now-playing updates can be signed.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage for the session key obtained through web authorization.
pub trait SessionAuthStore {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, session_key: &str) -> Result<()>;
    /// Forget the stored key. Returns whether one existed.
    fn clear(&self) -> Result<bool>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    session_key: String,
}

/// Session key kept as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileAuthStore {
    path: PathBuf,
}

impl FileAuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionAuthStore for FileAuthStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!("No stored session at {}", self.path.display());
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let stored: StoredSession = serde_json::from_str(&raw)
            .with_context(|| format!("Session file {} is corrupt", self.path.display()))?;
        Ok(Some(stored.session_key))
    }

    fn save(&self, session_key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let stored = StoredSession {
            session_key: session_key.to_string(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        info!("Session key saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = FileAuthStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileAuthStore::new(dir.path().join("nested").join("session.json"));

        store.save("abc123").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));

        assert!(store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let err = FileAuthStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
