//! Wall clock used for bench timestamps and activity entries.
//!
//! The match clock never reads wall time; only `lastBenchTime` and log
//! timestamps do, so tests swap in [`ManualTime`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use time::OffsetDateTime;

/// Unix milliseconds.
pub type Timestamp = u64;

pub trait TimeSource: Send {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        current_timestamp()
    }
}

/// Hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn starting_at(now: Timestamp) -> Self {
        Self { now: Arc::new(AtomicU64::new(now)) }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn current_timestamp() -> Timestamp {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

/// RFC 3339 text for a timestamp, "Unknown" if out of range.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    use time::format_description::well_known::Rfc3339;

    OffsetDateTime::from_unix_timestamp_nanos(timestamp as i128 * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "Unknown".to_string())
}
