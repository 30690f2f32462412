// 출전 시간 / 피로도 누적
use serde::{Deserialize, Serialize};

use crate::roster::Player;
use crate::time_source::Timestamp;

/// Severity bands of the raw fatigue counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueLevel {
    Fresh,
    Fatigued,
    /// Twice the threshold or more
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatigueTracker {
    threshold: u32,
}

impl FatigueTracker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// One played second. Benched players are untouched.
    pub fn accrue(&self, player: &mut Player) {
        if !player.on_field {
            return;
        }
        player.total_time_on_field = player.total_time_on_field.saturating_add(1);
        player.fatigue = player.fatigue.saturating_add(1);
    }

    pub fn reset_on_bench(&self, player: &mut Player, now: Timestamp) {
        player.fatigue = 0;
        player.last_bench_time = now;
    }

    /// Display flag: on the field and at or past the threshold.
    pub fn is_fatigued(&self, player: &Player) -> bool {
        player.on_field && player.fatigue >= self.threshold
    }

    pub fn level(&self, fatigue: u32) -> FatigueLevel {
        if fatigue < self.threshold {
            FatigueLevel::Fresh
        } else if fatigue < self.threshold.saturating_mul(2) {
            FatigueLevel::Fatigued
        } else {
            FatigueLevel::Severe
        }
    }

    /// 0.0 (fresh) .. 1.0 (at threshold), for colour blending.
    pub fn ratio(&self, fatigue: u32) -> f32 {
        if self.threshold == 0 {
            return 1.0;
        }
        (fatigue as f32 / self.threshold as f32).min(1.0)
    }
}
