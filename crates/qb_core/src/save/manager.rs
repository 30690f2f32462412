use super::error::SaveError;
use super::format::{decompress_and_deserialize, serialize_and_compress, SaveFile};
use super::store::StateStore;
use crate::config::EngineConfig;
use crate::engine::RotationEngine;

/// What `SaveManager::load_into` did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored,
    /// Nothing stored under the key; engine untouched.
    NoSave,
    /// Stored blob was unreadable; engine reset to the initial state.
    FellBack,
}

/// Persists one engine under one fixed key.
pub struct SaveManager<S: StateStore> {
    store: S,
    key: String,
}

impl<S: StateStore> SaveManager<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn for_config(store: S, config: &EngineConfig) -> Self {
        Self::new(store, config.storage_key.clone())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Returns the blob size in bytes.
    pub fn save(&mut self, engine: &RotationEngine) -> Result<usize, SaveError> {
        let data = serialize_and_compress(&SaveFile::new(engine.serialize()))?;
        self.store.write(&self.key, &data)?;
        log::debug!("Game saved under {:?} ({} bytes)", self.key, data.len());
        Ok(data.len())
    }

    /// Never fails: unreadable data falls back to the initial state.
    pub fn load_into(&self, engine: &mut RotationEngine) -> LoadOutcome {
        let bytes = match self.store.read(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::NoSave,
            Err(err) => {
                log::warn!("Reading save {:?} failed: {}", self.key, err);
                engine.reset_to_initial();
                return LoadOutcome::FellBack;
            }
        };

        let save = match decompress_and_deserialize(&bytes) {
            Ok(save) => save,
            Err(err) => {
                log::warn!("Discarding unreadable save {:?}: {}", self.key, err);
                engine.reset_to_initial();
                return LoadOutcome::FellBack;
            }
        };

        // restore() performs its own fallback when the shape is inconsistent
        if engine.restore(save.state) {
            log::info!("Game loaded from {:?}", self.key);
            LoadOutcome::Restored
        } else {
            LoadOutcome::FellBack
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self.store.read(&self.key), Ok(Some(_)))
    }

    pub fn clear(&mut self) -> Result<(), SaveError> {
        self.store.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::store::{FileStore, MemoryStore};
    use crate::time_source::ManualTime;
    use tempfile::TempDir;

    fn engine() -> RotationEngine {
        RotationEngine::with_time_source(EngineConfig::default(), ManualTime::starting_at(1_000))
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut source = engine();
        source.move_to_field_numbered(1, 8).unwrap();
        source.set_team_name("Otters");

        let mut manager = SaveManager::for_config(MemoryStore::new(), source.config());
        assert!(!manager.exists());
        manager.save(&source).unwrap();
        assert!(manager.exists());

        let mut target = engine();
        assert_eq!(manager.load_into(&mut target), LoadOutcome::Restored);
        assert_eq!(target.serialize(), source.serialize());
    }

    #[test]
    fn test_missing_save_leaves_engine_alone() {
        let manager = SaveManager::new(MemoryStore::new(), "quickBenchState");
        let mut target = engine();
        target.move_to_field_numbered(2, 5).unwrap();
        let before = target.serialize();

        assert_eq!(manager.load_into(&mut target), LoadOutcome::NoSave);
        assert_eq!(target.serialize(), before);
    }

    #[test]
    fn test_corrupt_save_falls_back_silently() {
        let mut store = MemoryStore::new();
        store.write("quickBenchState", b"definitely not a save file at all, no sir").unwrap();
        let manager = SaveManager::new(store, "quickBenchState");

        let mut target = engine();
        target.move_to_field_numbered(2, 5).unwrap();

        assert_eq!(manager.load_into(&mut target), LoadOutcome::FellBack);
        assert_eq!(target.registry().on_field_count(), 0);
        assert!(target.activity_log().is_empty());
    }

    #[test]
    fn test_file_store_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = engine();
        source.move_to_field_numbered(3, 21).unwrap();

        let mut manager = SaveManager::new(FileStore::new(temp_dir.path()), "quickBenchState");
        manager.save(&source).unwrap();

        // a second manager over the same directory sees the save
        let reader = SaveManager::new(FileStore::new(temp_dir.path()), "quickBenchState");
        let mut target = engine();
        assert_eq!(reader.load_into(&mut target), LoadOutcome::Restored);
        assert_eq!(target.player(3).unwrap().number, Some(21));

        manager.clear().unwrap();
        assert!(!reader.exists());
    }
}
