//! Durable key-value storage backing the saved locations.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::MeteoError;

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, MeteoError>;

    /// Overwrites any prior value.
    fn set(&self, key: &str, value: &str) -> Result<(), MeteoError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, MeteoError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MeteoError> {
        fs::create_dir_all(&self.dir)?;

        // Readers never see a half-written file.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        if let Err(e) = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = value.len(), "stored {key}");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, MeteoError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MeteoError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("not-created-yet"));

        assert_eq!(storage.get("weathers").unwrap(), None);
    }

    #[test]
    fn file_storage_overwrites_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        storage.set("weathers", "[1]").unwrap();
        storage.set("weathers", "[2]").unwrap();

        assert_eq!(storage.get("weathers").unwrap().as_deref(), Some("[2]"));
        assert!(storage.path_for("weathers").exists());
        assert!(!dir.path().join("nested/.weathers.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        // A directory at the target path makes the rename fail.
        fs::create_dir(storage.path_for("weathers")).unwrap();
        fs::write(storage.path_for("weathers").join("keep"), "x").unwrap();

        assert!(storage.set("weathers", "[1]").is_err());
        assert!(!dir.path().join(".weathers.json.tmp").exists());
    }

    #[test]
    fn memory_storage_keys_are_independent() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();

        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get("b").unwrap(), None);
    }
}
