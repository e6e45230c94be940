// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Named secret storage for the Strava credential set.
//!
//! The file-backed store keeps every secret in one JSON object with
//! owner-only permissions. Writes go to a temporary file that is renamed
//! over the original so a crash never leaves a truncated credential file.

use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const CREDENTIALS_FILENAME: &str = "credentials.json";

/// String-keyed secret storage that survives between runs.
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, AppError>;
    fn set(&self, name: &str, value: &str) -> Result<(), AppError>;
}

/// Credential store backed by a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Open (or lazily create) `credentials.json` inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(CREDENTIALS_FILENAME),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, AppError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), AppError> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(values)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only from creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;

        // mode() only applies to new files; a leftover tmp file keeps its own
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        Ok(self.load()?.remove(name))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Storage("Credential store lock poisoned".to_string()))?;

        let mut values = self.load()?;
        values.insert(name.to_string(), value.to_string());
        self.save(&values)
    }
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(name).map(|v| v.value().clone()))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_and_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path()).unwrap();

        assert_eq!(store.get("STRAVA_CLIENT_ID").unwrap(), None);
        store.set("STRAVA_CLIENT_ID", "123").unwrap();
        store.set("STRAVA_REFRESH_TOKEN", "abc").unwrap();
        store.set("STRAVA_REFRESH_TOKEN", "def").unwrap();

        // A fresh handle sees the same values
        let reopened = FileCredentialStore::new(temp_dir.path()).unwrap();
        assert_eq!(
            reopened.get("STRAVA_CLIENT_ID").unwrap(),
            Some("123".to_string())
        );
        assert_eq!(
            reopened.get("STRAVA_REFRESH_TOKEN").unwrap(),
            Some("def".to_string())
        );
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path()).unwrap();
        store.set("STRAVA_CLIENT_SECRET", "s3cret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_tmp_file_does_not_widen_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path()).unwrap();
        let tmp_path = store.path().with_extension("json.tmp");
        fs::write(&tmp_path, "{}").unwrap();
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o644)).unwrap();

        store.set("STRAVA_REFRESH_TOKEN", "abc").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(
            store.get("STRAVA_REFRESH_TOKEN").unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.get("STRAVA_CLIENT_ID"),
            Err(AppError::Storage(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get("x").unwrap(), None);
        store.set("x", "1").unwrap();
        assert_eq!(store.get("x").unwrap(), Some("1".to_string()));
    }
}
