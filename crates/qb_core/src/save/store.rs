//! Key/value storage media for the persisted blob.

use std::collections::HashMap;
use std::fs::{remove_file, rename, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::SaveError;

/// An external store holding opaque blobs under string keys.
pub trait StateStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError>;
    fn remove(&mut self, key: &str) -> Result<(), SaveError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.dat` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SaveError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SaveError::InvalidKey { key: key.to_string() });
        }
        Ok(self.dir.join(format!("{}.dat", key)))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path)?;
        log::debug!("Loaded {} bytes from {:?}", data.len(), path);
        Ok(Some(data))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Atomic save: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.flush()?;
            file.sync_all()?;
        }
        rename(&temp_path, &path)?;

        log::debug!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        let path = self.path_for(key)?;
        if path.exists() {
            remove_file(&path)?;
            log::info!("Deleted save {:?}", path);
        }
        Ok(())
    }
}
