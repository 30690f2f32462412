//! Quarter countdown state machine.
//!
//! ```text
//! Stopped --start--> Running --tick to 0--> QuarterComplete --acknowledge--> Stopped
//!    ^                  |
//!    +------pause-------+
//! ```
//!
//! The clock never drives itself. Whoever owns it calls [`MatchClock::tick`]
//! once per second while it reports [`ClockPhase::Running`].

use serde::{Deserialize, Serialize};

use crate::error::{StateError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockPhase {
    Stopped,
    Running,
    /// Countdown hit zero; waiting for the caller to acknowledge.
    QuarterComplete,
}

/// A point on the match clock: quarter plus seconds remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockStamp {
    pub quarter: u32,
    pub remaining: u32,
}

impl ClockStamp {
    /// Match seconds from `earlier` to `self`. Negative if `earlier` is later.
    pub fn seconds_since(&self, earlier: &ClockStamp, quarter_length: u32) -> i64 {
        let quarters = self.quarter as i64 - earlier.quarter as i64;
        quarters * quarter_length as i64 + earlier.remaining as i64 - self.remaining as i64
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock was not running; nothing changed.
    Idle,
    Ticked { remaining: u32 },
    QuarterEnded { quarter: u32 },
}

/// Serializable view of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub quarter_timer: u32,
    pub quarter: u32,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchClock {
    quarter_timer: u32,
    quarter: u32,
    phase: ClockPhase,
    quarter_length: u32,
}

impl MatchClock {
    pub fn new(quarter_length: u32) -> Self {
        Self { quarter_timer: quarter_length, quarter: 1, phase: ClockPhase::Stopped, quarter_length }
    }

    /// Adopt a restored timer/quarter. A zero timer resumes in `QuarterComplete`.
    pub fn restored(quarter_length: u32, quarter_timer: u32, quarter: u32) -> Self {
        let phase =
            if quarter_timer == 0 { ClockPhase::QuarterComplete } else { ClockPhase::Stopped };
        Self { quarter_timer: quarter_timer.min(quarter_length), quarter, phase, quarter_length }
    }

    pub fn quarter_timer(&self) -> u32 {
        self.quarter_timer
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    pub fn quarter_length(&self) -> u32 {
        self.quarter_length
    }

    /// True until the first second of the quarter has been played.
    pub fn at_quarter_start(&self) -> bool {
        self.quarter_timer == self.quarter_length
    }

    pub fn stamp(&self) -> ClockStamp {
        ClockStamp { quarter: self.quarter, remaining: self.quarter_timer }
    }

    pub fn state(&self) -> MatchState {
        MatchState {
            quarter_timer: self.quarter_timer,
            quarter: self.quarter,
            running: self.is_running(),
        }
    }

    /// Validation half of [`start`](Self::start). `Ok(false)`: already running.
    pub fn check_start(&self, on_field: usize, required: usize) -> Result<bool, ValidationError> {
        match self.phase {
            ClockPhase::Running => Ok(false),
            ClockPhase::QuarterComplete => {
                Err(ValidationError::QuarterPending { quarter: self.quarter })
            }
            ClockPhase::Stopped if on_field != required => {
                Err(ValidationError::FieldNotReady { required, found: on_field })
            }
            ClockPhase::Stopped => Ok(true),
        }
    }

    /// Returns `Ok(true)` if the clock started, `Ok(false)` if it already ran.
    pub fn start(&mut self, on_field: usize, required: usize) -> Result<bool, ValidationError> {
        let starts = self.check_start(on_field, required)?;
        if starts {
            self.phase = ClockPhase::Running;
        }
        Ok(starts)
    }

    /// Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if self.phase == ClockPhase::Running {
            self.phase = ClockPhase::Stopped;
            true
        } else {
            false
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != ClockPhase::Running {
            return TickOutcome::Idle;
        }

        self.quarter_timer = self.quarter_timer.saturating_sub(1);
        if self.quarter_timer == 0 {
            self.phase = ClockPhase::QuarterComplete;
            return TickOutcome::QuarterEnded { quarter: self.quarter };
        }
        TickOutcome::Ticked { remaining: self.quarter_timer }
    }

    /// Second phase of a quarter end: advance and rewind the countdown.
    pub fn acknowledge_quarter_end(&mut self) -> Result<u32, StateError> {
        if self.phase != ClockPhase::QuarterComplete {
            return Err(StateError::NoQuarterPending);
        }
        self.quarter += 1;
        self.quarter_timer = self.quarter_length;
        self.phase = ClockPhase::Stopped;
        Ok(self.quarter)
    }

    /// "MM:SS"
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.quarter_timer / 60, self.quarter_timer % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_full_field() {
        let mut clock = MatchClock::new(600);
        assert_eq!(clock.start(3, 4), Err(ValidationError::FieldNotReady { required: 4, found: 3 }));
        assert_eq!(clock.phase(), ClockPhase::Stopped);

        assert_eq!(clock.start(4, 4), Ok(true));
        assert!(clock.is_running());

        // already running: no-op
        assert_eq!(clock.start(4, 4), Ok(false));
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut clock = MatchClock::new(600);
        let before = clock.clone();
        assert!(!clock.pause());
        assert_eq!(clock, before);

        clock.start(4, 4).unwrap();
        assert!(clock.pause());
        assert!(!clock.pause());
        assert_eq!(clock.phase(), ClockPhase::Stopped);
    }

    #[test]
    fn test_tick_only_while_running() {
        let mut clock = MatchClock::new(600);
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.quarter_timer(), 600);

        clock.start(4, 4).unwrap();
        assert_eq!(clock.tick(), TickOutcome::Ticked { remaining: 599 });
        clock.pause();
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.quarter_timer(), 599);
    }

    #[test]
    fn test_quarter_end_needs_acknowledgement() {
        let mut clock = MatchClock::new(3);
        clock.start(4, 4).unwrap();
        clock.tick();
        clock.tick();
        assert_eq!(clock.tick(), TickOutcome::QuarterEnded { quarter: 1 });
        assert_eq!(clock.phase(), ClockPhase::QuarterComplete);
        assert!(!clock.state().running);

        // no further ticks, and no restart until acknowledged
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.start(4, 4), Err(ValidationError::QuarterPending { quarter: 1 }));
        assert_eq!(clock.quarter(), 1);
        assert_eq!(clock.quarter_timer(), 0);

        assert_eq!(clock.acknowledge_quarter_end(), Ok(2));
        assert_eq!(clock.quarter_timer(), 3);
        assert_eq!(clock.phase(), ClockPhase::Stopped);
        assert_eq!(clock.acknowledge_quarter_end(), Err(StateError::NoQuarterPending));
    }

    #[test]
    fn test_restored_zero_timer_is_pending() {
        let clock = MatchClock::restored(600, 0, 2);
        assert_eq!(clock.phase(), ClockPhase::QuarterComplete);

        let clock = MatchClock::restored(600, 250, 3);
        assert_eq!(clock.phase(), ClockPhase::Stopped);
        assert_eq!(clock.stamp(), ClockStamp { quarter: 3, remaining: 250 });
    }

    #[test]
    fn test_display() {
        let clock = MatchClock::restored(600, 65, 1);
        assert_eq!(clock.display(), "01:05");
        assert_eq!(MatchClock::new(600).display(), "10:00");
    }

    #[test]
    fn test_stamp_seconds_since() {
        let goal = ClockStamp { quarter: 1, remaining: 500 };
        let now = ClockStamp { quarter: 1, remaining: 420 };
        assert_eq!(now.seconds_since(&goal, 600), 80);

        // across a quarter boundary
        let goal = ClockStamp { quarter: 1, remaining: 30 };
        let now = ClockStamp { quarter: 2, remaining: 590 };
        assert_eq!(now.seconds_since(&goal, 600), 40);
    }
}
