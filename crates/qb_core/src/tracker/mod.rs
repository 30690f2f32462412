//! Fatigue and streak bookkeeping. Pure functions over [`Player`](crate::roster::Player).

pub mod fatigue;
pub mod streak;

pub use fatigue::{FatigueLevel, FatigueTracker};
pub use streak::{StreakTick, StreakTracker};
