//! # qb_core - Roster Rotation Engine
//!
//! Tracks a small team-sports roster across timed quarters: who is on the
//! field, who is resting, how tired they are, who is on a scoring streak,
//! and what happened recently, with a bounded undo.
//!
//! ## Features
//! - Capacity-limited field/bench placement with unique shirt numbers
//! - Quarter countdown driven by an injected scheduler
//! - Fatigue accrual and "on fire" streak detection
//! - Activity log, undo history and a persisted game blob
//! - JSON API for front ends

// Doc formatting lints - purely cosmetic, fix incrementally
#![allow(clippy::doc_lazy_continuation)]
// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Large enum variants - boxing would require API changes
#![allow(clippy::large_enum_variant)]

pub mod activity_log;
pub mod api;
pub mod clock;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod history;
pub mod roster;
pub mod save;
pub mod time_source;
pub mod tracker;

// Re-export main API functions
pub use api::{handle_request_json, CommandRequest, CommandResponse};

pub use clock::{ClockPhase, MatchClock, MatchState, TickOutcome};
pub use config::EngineConfig;
pub use driver::{drive_clock, DriveStop, DriveSummary, ImmediateScheduler, IntervalScheduler, Scheduler};
pub use engine::{FieldMove, Notification, PendingNumber, RotationEngine};
pub use error::{ConfigError, Result, RotationError, StateError, ValidationError};
pub use roster::{Player, PlayerId, PlayerRegistry};

// Re-export save system
pub use save::{FileStore, LoadOutcome, MemoryStore, PersistedState, SaveError, SaveManager};

pub use time_source::{ManualTime, SystemTime, TimeSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SCHEMA_VERSION: u8 = 1;
