//! Tick scheduling.
//!
//! The engine never owns a timer. A [`Scheduler`] decides how long to wait
//! between ticks, and [`drive_clock`] keeps calling `tick()` while the clock
//! runs. Tests use [`ImmediateScheduler`] to play a whole quarter
//! synchronously.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::clock::TickOutcome;
use crate::engine::RotationEngine;

pub trait Scheduler {
    /// Block until the next tick is due.
    fn wait(&mut self);
}

/// Real-time pacing: one tick per interval (one second by default).
#[derive(Debug, Clone, Copy)]
pub struct IntervalScheduler {
    interval: Duration,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Scheduler for IntervalScheduler {
    fn wait(&mut self) {
        thread::sleep(self.interval);
    }
}

/// No waiting at all. Counts how often it was asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler {
    pub waits: u64,
}

impl Scheduler for ImmediateScheduler {
    fn wait(&mut self) {
        self.waits += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveStop {
    /// Clock was stopped before the first tick, or paused between ticks.
    NotRunning,
    QuarterEnded { quarter: u32 },
    /// Tick budget used up with the clock still running.
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSummary {
    pub ticks: u32,
    pub stop: DriveStop,
}

/// Tick the engine until the quarter ends, the clock stops, or `max_ticks`
/// ticks have been delivered. `None` means no budget.
pub fn drive_clock<S: Scheduler>(
    engine: &mut RotationEngine,
    scheduler: &mut S,
    max_ticks: Option<u32>,
) -> DriveSummary {
    let mut ticks = 0;
    loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            return DriveSummary { ticks, stop: DriveStop::Budget };
        }
        if !engine.match_state().running {
            return DriveSummary { ticks, stop: DriveStop::NotRunning };
        }

        scheduler.wait();
        match engine.tick() {
            TickOutcome::Idle => return DriveSummary { ticks, stop: DriveStop::NotRunning },
            TickOutcome::Ticked { remaining } => {
                ticks += 1;
                debug!(remaining, "tick");
            }
            TickOutcome::QuarterEnded { quarter } => {
                ticks += 1;
                return DriveSummary { ticks, stop: DriveStop::QuarterEnded { quarter } };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::time_source::ManualTime;

    fn running_engine(quarter_length_secs: u32) -> RotationEngine {
        let config = EngineConfig { quarter_length_secs, ..EngineConfig::default() };
        let mut engine = RotationEngine::with_time_source(config, ManualTime::starting_at(0));
        for id in 1..=4 {
            engine.move_to_field_numbered(id, id).unwrap();
        }
        engine.start_clock().unwrap();
        engine
    }

    #[test]
    fn test_drive_full_quarter() {
        let mut engine = running_engine(600);
        let mut scheduler = ImmediateScheduler::default();

        let summary = drive_clock(&mut engine, &mut scheduler, None);
        assert_eq!(summary, DriveSummary { ticks: 600, stop: DriveStop::QuarterEnded { quarter: 1 } });
        assert_eq!(scheduler.waits, 600);
        assert_eq!(engine.player(1).unwrap().total_time_on_field, 600);

        // nothing more to drive until the quarter is acknowledged
        let summary = drive_clock(&mut engine, &mut scheduler, None);
        assert_eq!(summary, DriveSummary { ticks: 0, stop: DriveStop::NotRunning });
    }

    #[test]
    fn test_drive_respects_budget() {
        let mut engine = running_engine(600);
        let summary = drive_clock(&mut engine, &mut ImmediateScheduler::default(), Some(15));
        assert_eq!(summary, DriveSummary { ticks: 15, stop: DriveStop::Budget });
        assert_eq!(engine.clock().quarter_timer(), 585);
        assert!(engine.match_state().running);
    }

    #[test]
    fn test_stopped_clock_is_not_driven() {
        let mut engine = running_engine(600);
        engine.pause_clock();
        let mut scheduler = ImmediateScheduler::default();
        let summary = drive_clock(&mut engine, &mut scheduler, Some(10));
        assert_eq!(summary.stop, DriveStop::NotRunning);
        assert_eq!(scheduler.waits, 0);
    }

    #[test]
    fn test_interval_scheduler_waits() {
        let mut engine = running_engine(2);
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(1));
        let started = std::time::Instant::now();
        let summary = drive_clock(&mut engine, &mut scheduler, None);
        assert_eq!(summary.stop, DriveStop::QuarterEnded { quarter: 1 });
        assert!(started.elapsed() >= Duration::from_millis(2));
    }
}
