use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::roster::PlayerId;

/// Bench player the engine proposes to bring on next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub player_id: PlayerId,
    pub label: String,
}

/// Events for collaborators (renderer, audio, persistence). At most one per
/// causing operation; drained with `RotationEngine::take_notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    PlayerMovedToField { player_id: PlayerId, number: u32, ready_to_start: bool },
    PlayerMovedToBench { player_id: PlayerId, suggestion: Option<Suggestion> },
    GoalScored { player_id: PlayerId, goals: u32, on_fire: bool },
    /// Needs `acknowledge_quarter_end` before the next quarter can start.
    QuarterEnded { quarter: u32 },
    CapacityExceeded { capacity: usize },
    DuplicateNumber { number: u32 },
    InvalidNumber { input: String },
    HistoryEmpty,
}

impl Notification {
    /// Rejections the front end shows as an alert. Others stay silent.
    pub fn from_rejection(err: &ValidationError) -> Option<Self> {
        match err {
            ValidationError::CapacityExceeded { capacity } => {
                Some(Notification::CapacityExceeded { capacity: *capacity })
            }
            ValidationError::DuplicateNumber { number, .. } => {
                Some(Notification::DuplicateNumber { number: *number })
            }
            ValidationError::InvalidNumber { input } => {
                Some(Notification::InvalidNumber { input: input.clone() })
            }
            _ => None,
        }
    }

    /// Raised by a refused call rather than by a state change.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Notification::CapacityExceeded { .. }
                | Notification::DuplicateNumber { .. }
                | Notification::InvalidNumber { .. }
                | Notification::HistoryEmpty
        )
    }

    /// Prompt text, if the notification asks something of the user.
    pub fn prompt(&self) -> Option<String> {
        match self {
            Notification::PlayerMovedToField { ready_to_start: true, .. } => {
                Some("The field is full. Ready to start the quarter?".to_string())
            }
            Notification::PlayerMovedToBench { suggestion: Some(s), .. } => Some(format!(
                "Suggestion: Bring in {}. They have been on the bench the longest.",
                s.label
            )),
            Notification::QuarterEnded { quarter } => {
                Some(format!("End of Quarter {}. Continue to the next quarter?", quarter))
            }
            Notification::CapacityExceeded { capacity } => {
                Some(format!("The field already has {} players. Bench a player first.", capacity))
            }
            Notification::DuplicateNumber { number } => {
                Some(format!("Player number {} is already in use.", number))
            }
            Notification::InvalidNumber { .. } => {
                Some("Invalid number. Please enter a valid player number.".to_string())
            }
            Notification::HistoryEmpty => Some("No more actions to undo.".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_alerting_rejections_notify() {
        let capacity = ValidationError::CapacityExceeded { capacity: 4 };
        assert_eq!(
            Notification::from_rejection(&capacity),
            Some(Notification::CapacityExceeded { capacity: 4 })
        );
        assert_eq!(Notification::from_rejection(&ValidationError::NotOnField(1)), None);
    }

    #[test]
    fn test_json_is_tagged() {
        let n = Notification::GoalScored { player_id: 2, goals: 3, on_fire: true };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "GoalScored");
        assert_eq!(value["on_fire"], true);
    }

    #[test]
    fn test_prompts() {
        let ready = Notification::PlayerMovedToField { player_id: 1, number: 4, ready_to_start: true };
        assert_eq!(ready.prompt().unwrap(), "The field is full. Ready to start the quarter?");

        let quiet =
            Notification::PlayerMovedToField { player_id: 1, number: 4, ready_to_start: false };
        assert_eq!(quiet.prompt(), None);

        let bench = Notification::PlayerMovedToBench {
            player_id: 1,
            suggestion: Some(Suggestion { player_id: 5, label: "Player #9".to_string() }),
        };
        assert!(bench.prompt().unwrap().starts_with("Suggestion: Bring in Player #9."));
    }
}
