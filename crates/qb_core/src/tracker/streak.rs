//! On-fire streak detection.
//!
//! Goals are stamped with the match clock, not wall time, so a paused clock
//! freezes both the window and the cooldown.

use crate::clock::ClockStamp;
use crate::config::EngineConfig;
use crate::roster::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTick {
    /// Player is not on fire.
    Cold,
    Cooling { remaining: u32 },
    /// Cooldown ran out this tick.
    CooledDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakTracker {
    window_secs: u32,
    goal_count: usize,
    cooldown_ticks: u32,
    quarter_length: u32,
}

impl StreakTracker {
    pub fn new(window_secs: u32, goal_count: usize, cooldown_ticks: u32, quarter_length: u32) -> Self {
        Self { window_secs, goal_count, cooldown_ticks, quarter_length }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.on_fire_window_secs,
            config.on_fire_goal_count,
            config.on_fire_cooldown_ticks,
            config.quarter_length_secs,
        )
    }

    /// Record a goal scored at `now` and re-evaluate. Returns the on-fire flag.
    pub fn record_goal(&self, player: &mut Player, now: ClockStamp) -> bool {
        player.recent_goals.push(now);

        let window = self.window_secs as i64;
        let quarter_length = self.quarter_length;
        player.recent_goals.retain(|goal| now.seconds_since(goal, quarter_length) < window);

        if player.recent_goals.len() >= self.goal_count {
            player.on_fire = true;
            player.on_fire_cooldown = Some(self.cooldown_ticks);
        }
        player.on_fire
    }

    /// One clock second of cooldown.
    pub fn tick(&self, player: &mut Player) -> StreakTick {
        if !player.on_fire {
            return StreakTick::Cold;
        }

        let remaining = player.on_fire_cooldown.unwrap_or(0).saturating_sub(1);
        if remaining == 0 {
            player.on_fire = false;
            player.on_fire_cooldown = None;
            player.recent_goals.clear();
            return StreakTick::CooledDown;
        }

        player.on_fire_cooldown = Some(remaining);
        StreakTick::Cooling { remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> StreakTracker {
        StreakTracker::from_config(&EngineConfig::default())
    }

    fn at(remaining: u32) -> ClockStamp {
        ClockStamp { quarter: 1, remaining }
    }

    #[test]
    fn test_three_goals_inside_window_ignite() {
        let streak = tracker();
        let mut player = Player::new(1, 0);

        assert!(!streak.record_goal(&mut player, at(590)));
        assert!(!streak.record_goal(&mut player, at(550)));
        assert!(streak.record_goal(&mut player, at(480)));
        assert_eq!(player.on_fire_cooldown, Some(30));
        assert_eq!(player.recent_goals.len(), 3);
    }

    #[test]
    fn test_old_goals_fall_out_of_window() {
        let streak = tracker();
        let mut player = Player::new(1, 0);

        streak.record_goal(&mut player, at(590));
        streak.record_goal(&mut player, at(500));
        // 590 - 470 = 120: no longer inside the window
        assert!(!streak.record_goal(&mut player, at(470)));
        assert_eq!(player.recent_goals, vec![at(500), at(470)]);
    }

    #[test]
    fn test_window_spans_quarter_boundary() {
        let streak = tracker();
        let mut player = Player::new(1, 0);

        streak.record_goal(&mut player, at(40));
        streak.record_goal(&mut player, at(10));
        let next_quarter = ClockStamp { quarter: 2, remaining: 560 };
        // 40 -> q2 560 is 80 seconds of play
        assert!(streak.record_goal(&mut player, next_quarter));

        let mut player = Player::new(2, 0);
        streak.record_goal(&mut player, at(40));
        streak.record_goal(&mut player, at(10));
        let much_later = ClockStamp { quarter: 2, remaining: 300 };
        assert!(!streak.record_goal(&mut player, much_later));
    }

    #[test]
    fn test_cooldown_runs_out() {
        let streak = tracker();
        let mut player = Player::new(1, 0);
        for t in [590, 580, 570] {
            streak.record_goal(&mut player, at(t));
        }

        for expected in (1..30).rev() {
            assert_eq!(streak.tick(&mut player), StreakTick::Cooling { remaining: expected });
        }
        assert_eq!(streak.tick(&mut player), StreakTick::CooledDown);
        assert!(!player.on_fire);
        assert_eq!(player.on_fire_cooldown, None);
        assert!(player.recent_goals.is_empty());
        assert_eq!(streak.tick(&mut player), StreakTick::Cold);
    }

    #[test]
    fn test_goal_while_on_fire_refreshes_cooldown() {
        let streak = tracker();
        let mut player = Player::new(1, 0);
        for t in [590, 580, 570] {
            streak.record_goal(&mut player, at(t));
        }
        for _ in 0..10 {
            streak.tick(&mut player);
        }
        assert_eq!(player.on_fire_cooldown, Some(20));

        assert!(streak.record_goal(&mut player, at(560)));
        assert_eq!(player.on_fire_cooldown, Some(30));
    }
}
