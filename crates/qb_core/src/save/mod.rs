// Save/Load System
// MessagePack + LZ4 compression with versioning and integrity checks

pub mod error;
pub mod format;
pub mod manager;
pub mod store;

pub use error::SaveError;
pub use format::{decompress_and_deserialize, serialize_and_compress, PersistedState, SaveFile};
pub use manager::{LoadOutcome, SaveManager};
pub use store::{FileStore, MemoryStore, StateStore};

pub const SAVE_VERSION: u32 = 1;
