//! Player registry: the roster, number assignment and leaderboard queries.

pub mod player;
pub mod registry;

pub use player::{format_minutes_seconds, Player, PlayerId};
pub use registry::{parse_number, LeaderEntry, Leaderboard, PlayerRegistry, NO_LEADER};
