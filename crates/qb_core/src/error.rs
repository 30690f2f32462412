use thiserror::Error;

use crate::roster::PlayerId;

/// Rejections raised while validating a caller action.
///
/// These never leave the engine in a partially mutated state: every check
/// runs before the first write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Player {0} not found")]
    NotFound(PlayerId),

    #[error("Player number {number} is already in use")]
    DuplicateNumber { number: u32, holder: PlayerId },

    #[error("Invalid number {input:?}. Please enter a valid player number")]
    InvalidNumber { input: String },

    #[error("The field already has {capacity} players. Bench a player first")]
    CapacityExceeded { capacity: usize },

    #[error("Player {0} is not on the field")]
    NotOnField(PlayerId),

    #[error("Player {0} is already on the field")]
    AlreadyOnField(PlayerId),

    #[error("Need exactly {required} players on the field to start, found {found}")]
    FieldNotReady { required: usize, found: usize },

    #[error("Quarter {quarter} has ended and must be acknowledged first")]
    QuarterPending { quarter: u32 },

    #[error("No number assignment is pending for player {0}")]
    NoPendingAssignment(PlayerId),
}

/// Advisory conditions: the call was a no-op, nothing went wrong.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("No more actions to undo")]
    HistoryEmpty,

    #[error("No quarter end is awaiting acknowledgement")]
    NoQuarterPending,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl RotationError {
    /// Advisory errors are surfaced to the user as a notice, not an alert.
    pub fn is_advisory(&self) -> bool {
        matches!(self, RotationError::State(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, RotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_front_end_alerts() {
        let err = ValidationError::CapacityExceeded { capacity: 4 };
        assert_eq!(err.to_string(), "The field already has 4 players. Bench a player first");

        let err = ValidationError::DuplicateNumber { number: 7, holder: 3 };
        assert_eq!(err.to_string(), "Player number 7 is already in use");

        assert_eq!(StateError::HistoryEmpty.to_string(), "No more actions to undo");
    }

    #[test]
    fn test_advisory_classification() {
        let advisory: RotationError = StateError::HistoryEmpty.into();
        assert!(advisory.is_advisory());

        let rejection: RotationError = ValidationError::NotOnField(2).into();
        assert!(!rejection.is_advisory());
    }
}
