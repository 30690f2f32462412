use serde::{Deserialize, Serialize};

use crate::clock::ClockStamp;
use crate::time_source::Timestamp;

pub type PlayerId = u32;

/// One roster slot. Created at game start, never destroyed individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    /// Shirt number, unset until the player first goes on
    pub number: Option<u32>,
    /// Seconds spent on the field across the game
    pub total_time_on_field: u32,
    pub goals: u32,
    pub on_field: bool,
    /// Seconds on the field since last benched (uncapped)
    pub fatigue: u32,
    pub last_bench_time: Timestamp,
    #[serde(default)]
    pub on_fire: bool,
    /// Goals still inside the on-fire window, oldest first
    #[serde(default)]
    pub recent_goals: Vec<ClockStamp>,
    /// Ticks left before the streak cools down; `Some` only while on fire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_fire_cooldown: Option<u32>,
}

impl Player {
    pub fn new(id: PlayerId, now: Timestamp) -> Self {
        Self {
            id,
            number: None,
            total_time_on_field: 0,
            goals: 0,
            on_field: false,
            fatigue: 0,
            last_bench_time: now,
            on_fire: false,
            recent_goals: Vec::new(),
            on_fire_cooldown: None,
        }
    }

    /// Card title: "Player No. 7", or "Player No. #" before a number is set.
    pub fn display_name(&self) -> String {
        match self.number {
            Some(number) => format!("Player No. {}", number),
            None => "Player No. #".to_string(),
        }
    }

    /// Short label used in activity messages.
    pub fn label(&self) -> String {
        match self.number {
            Some(number) => format!("Player #{}", number),
            None => "unassigned player".to_string(),
        }
    }

    /// "3m 5s"
    pub fn time_on_field_display(&self) -> String {
        format_minutes_seconds(self.total_time_on_field)
    }
}

pub fn format_minutes_seconds(seconds: u32) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
