use serde::{Deserialize, Serialize};

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use sha2::{Digest, Sha256};

use super::error::SaveError;
use super::SAVE_VERSION;
use crate::activity_log::ActivityEntry;
use crate::roster::{Player, PlayerRegistry};
use crate::time_source::{current_timestamp, Timestamp};

/// Upper bound on roster size accepted from storage.
const MAX_PLAYERS: usize = 100;

/// The persisted shape: everything needed to resume a game.
///
/// Undo history is not part of it; a restored game starts with an
/// empty undo stack.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub players: Vec<Player>,
    pub activity_log: Vec<ActivityEntry>,
    pub quarter_timer: u32,
    pub quarter: u32,
    #[serde(default)]
    pub team_name: String,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Shape-level sanity: clock in range and roster invariants intact.
    pub fn check(&self, field_capacity: usize, quarter_length: u32) -> Result<(), SaveError> {
        if self.players.len() > MAX_PLAYERS {
            return Err(SaveError::DataTooLarge { size: self.players.len() });
        }
        if self.quarter == 0 {
            return Err(SaveError::Corrupted("quarter must be positive".to_string()));
        }
        if self.quarter_timer > quarter_length {
            return Err(SaveError::Corrupted(format!(
                "quarter timer {} exceeds quarter length {}",
                self.quarter_timer, quarter_length
            )));
        }
        PlayerRegistry::from_players(self.players.clone())
            .check_consistency(field_capacity)
            .map_err(SaveError::Corrupted)
    }
}

/// Versioned envelope written to storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    /// Save format version for migration
    pub version: u32,

    /// Save timestamp (unix milliseconds)
    pub timestamp: Timestamp,

    pub state: PersistedState,
}

impl SaveFile {
    pub fn new(state: PersistedState) -> Self {
        Self { version: SAVE_VERSION, timestamp: current_timestamp(), state }
    }
}

/// MessagePack (named) → LZ4 (size prepended) → SHA-256 trailer.
pub fn serialize_and_compress(save: &SaveFile) -> Result<Vec<u8>, SaveError> {
    if save.state.players.len() > MAX_PLAYERS {
        return Err(SaveError::DataTooLarge { size: save.state.players.len() });
    }

    let msgpack = to_vec_named(save)?;
    let compressed = compress_prepend_size(&msgpack);

    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let checksum = hasher.finalize();

    let mut result = compressed;
    result.extend_from_slice(&checksum);
    Ok(result)
}

pub fn decompress_and_deserialize(bytes: &[u8]) -> Result<SaveFile, SaveError> {
    // size header + checksum
    if bytes.len() < 4 + 32 {
        return Err(SaveError::Corrupted(format!("only {} bytes", bytes.len())));
    }

    let (payload, checksum_bytes) = bytes.split_at(bytes.len() - 32);

    let mut hasher = Sha256::new();
    hasher.update(payload);
    if hasher.finalize()[..] != *checksum_bytes {
        return Err(SaveError::ChecksumMismatch);
    }

    let msgpack = decompress_size_prepended(payload).map_err(|_| SaveError::Decompression)?;
    let save: SaveFile = from_slice(&msgpack)?;

    if save.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch { found: save.version, expected: SAVE_VERSION });
    }

    Ok(save)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::PlayerRegistry;

    fn state() -> PersistedState {
        let mut players = PlayerRegistry::new(8, 0).into_players();
        players[0].number = Some(10);
        players[0].on_field = true;
        players[0].goals = 2;
        PersistedState {
            players,
            activity_log: vec![ActivityEntry {
                timestamp: 7,
                message: "Player #10 moved to the field.".to_string(),
            }],
            quarter_timer: 433,
            quarter: 2,
            team_name: "Otters".to_string(),
        }
    }

    #[test]
    fn test_binary_roundtrip() {
        let save = SaveFile::new(state());
        let bytes = serialize_and_compress(&save).unwrap();
        let loaded = decompress_and_deserialize(&bytes).unwrap();
        assert_eq!(loaded, save);
    }

    #[test]
    fn test_checksum_validation() {
        let mut bytes = serialize_and_compress(&SaveFile::new(state())).unwrap();
        if let Some(last) = bytes.last_mut() {
            *last = last.wrapping_add(1);
        }
        assert!(matches!(decompress_and_deserialize(&bytes), Err(SaveError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_blob_is_corrupted() {
        assert!(matches!(decompress_and_deserialize(&[1, 2, 3]), Err(SaveError::Corrupted(_))));
    }

    #[test]
    fn test_json_shape_keys() {
        let json = state().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in ["players", "activityLog", "quarterTimer", "quarter", "teamName"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(PersistedState::from_json(&json).unwrap(), state());
    }

    #[test]
    fn test_check_rejects_bad_clock() {
        let mut s = state();
        assert!(s.check(4, 600).is_ok());
        s.quarter = 0;
        assert!(s.check(4, 600).is_err());

        let mut s = state();
        s.quarter_timer = 601;
        assert!(s.check(4, 600).is_err());
    }
}
