//! Rotation Engine
//!
//! The single owned aggregate behind every mutation: roster, match clock,
//! activity log and undo history. Callers go through its operations only;
//! collaborators read borrowed views, serialized state or drained
//! [`Notification`]s.
//!
//! ## Operations
//! - `move_to_field` / `commit_number` / `cancel_number`: two-phase entry for
//!   unnumbered players
//! - `move_to_bench`: returns a substitution suggestion
//! - `score_goal`: goal + streak evaluation while the clock runs
//! - `start_clock` / `pause_clock` / `tick` / `acknowledge_quarter_end`
//! - `undo` / `new_game`
//! - `serialize` / `restore`
//!
//! Every mutating operation validates first, then pushes an undo snapshot,
//! then writes. A rejected call leaves state untouched.

mod notifications;

pub use notifications::{Notification, Suggestion};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity_log::ActivityLog;
use crate::clock::{ClockPhase, MatchClock, MatchState, TickOutcome};
use crate::config::EngineConfig;
use crate::error::{Result, RotationError, StateError, ValidationError};
use crate::history::{HistoryManager, HistorySnapshot};
use crate::roster::{parse_number, Leaderboard, Player, PlayerId, PlayerRegistry};
use crate::save::PersistedState;
use crate::time_source::{SystemTime, TimeSource};
use crate::tracker::{FatigueLevel, FatigueTracker, StreakTick, StreakTracker};

/// Token for a field entry waiting on a shirt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNumber {
    pub player_id: PlayerId,
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMove {
    Moved { player_id: PlayerId, number: u32, ready_to_start: bool },
    /// Phase one of a two-phase entry: resolve with `commit_number`.
    NumberRequired(PendingNumber),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchMove {
    pub player_id: PlayerId,
    pub suggestion: Option<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalOutcome {
    pub player_id: PlayerId,
    pub goals: u32,
    pub on_fire: bool,
    pub leaderboard: Leaderboard,
}

pub struct RotationEngine {
    config: EngineConfig,
    registry: PlayerRegistry,
    clock: MatchClock,
    log: ActivityLog,
    history: HistoryManager,
    fatigue: FatigueTracker,
    streak: StreakTracker,
    team_name: String,
    time: Box<dyn TimeSource>,
    pending: Option<PendingNumber>,
    next_token: u64,
    notifications: Vec<Notification>,
}

impl RotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_time_source(config, SystemTime)
    }

    pub fn with_time_source(config: EngineConfig, time: impl TimeSource + 'static) -> Self {
        let now = time.now();
        Self {
            registry: PlayerRegistry::new(config.roster_size, now),
            clock: MatchClock::new(config.quarter_length_secs),
            log: ActivityLog::new(config.activity_log_capacity),
            history: HistoryManager::new(config.history_depth),
            fatigue: FatigueTracker::new(config.fatigue_threshold),
            streak: StreakTracker::from_config(&config),
            team_name: config.team_name.clone(),
            time: Box::new(time),
            pending: None,
            next_token: 1,
            notifications: Vec::new(),
            config,
        }
    }

    // ========================
    // Read access
    // ========================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn players(&self) -> &[Player] {
        self.registry.players()
    }

    pub fn player(&self, id: PlayerId) -> std::result::Result<&Player, ValidationError> {
        self.registry.get(id)
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn match_state(&self) -> MatchState {
        self.clock.state()
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn leaderboard(&self) -> Leaderboard {
        self.registry.leaderboard()
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn team_score(&self) -> u32 {
        self.registry.team_score()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn pending_number(&self) -> Option<PendingNumber> {
        self.pending
    }

    pub fn is_fatigued(&self, id: PlayerId) -> bool {
        self.registry.get(id).map(|p| self.fatigue.is_fatigued(p)).unwrap_or(false)
    }

    pub fn fatigue_level(&self, id: PlayerId) -> std::result::Result<FatigueLevel, ValidationError> {
        Ok(self.fatigue.level(self.registry.get(id)?.fatigue))
    }

    pub fn fatigue_ratio(&self, id: PlayerId) -> std::result::Result<f32, ValidationError> {
        Ok(self.fatigue.ratio(self.registry.get(id)?.fatigue))
    }

    /// Drain queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ========================
    // Roster moves
    // ========================

    /// Put a benched player on the field.
    ///
    /// Numbered players move at once. Unnumbered players get a
    /// [`PendingNumber`] to resolve with [`commit_number`](Self::commit_number).
    pub fn move_to_field(&mut self, id: PlayerId) -> Result<FieldMove> {
        match self.check_field_entry(id) {
            Err(err) => self.reject(err),
            Ok(Some(number)) => {
                self.push_snapshot();
                self.place_on_field(id, number)
            }
            Ok(None) => {
                let pending = PendingNumber { player_id: id, token: self.next_token };
                self.next_token += 1;
                self.pending = Some(pending);
                debug!(player_id = id, "number required before field entry");
                Ok(FieldMove::NumberRequired(pending))
            }
        }
    }

    /// Phase two: validate the typed number, then assign and move.
    ///
    /// A rejected number keeps the token alive so the caller can retry.
    pub fn commit_number(&mut self, pending: PendingNumber, raw: &str) -> Result<FieldMove> {
        if self.pending != Some(pending) {
            return self.reject(ValidationError::NoPendingAssignment(pending.player_id));
        }

        let id = pending.player_id;
        let number = match self.validate_new_number(id, raw) {
            Ok(number) => number,
            Err(err) => return self.reject(err),
        };

        self.pending = None;
        self.push_snapshot();
        self.registry.assign_number(id, number)?;
        self.place_on_field(id, number)
    }

    /// Drop a pending assignment. Returns whether the token was live.
    pub fn cancel_number(&mut self, pending: PendingNumber) -> bool {
        if self.pending == Some(pending) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Single-step entry for callers that already hold the number.
    ///
    /// `number` only applies if the player has none yet.
    pub fn move_to_field_numbered(&mut self, id: PlayerId, number: u32) -> Result<FieldMove> {
        let assigned = match self.check_field_entry(id) {
            Ok(assigned) => assigned,
            Err(err) => return self.reject(err),
        };

        match assigned {
            Some(existing) => {
                self.push_snapshot();
                self.place_on_field(id, existing)
            }
            None => {
                if let Err(err) = self.registry.check_number(id, number) {
                    return self.reject(err);
                }
                if self.pending.map(|p| p.player_id) == Some(id) {
                    self.pending = None;
                }
                self.push_snapshot();
                self.registry.assign_number(id, number)?;
                self.place_on_field(id, number)
            }
        }
    }

    pub fn move_to_bench(&mut self, id: PlayerId) -> Result<BenchMove> {
        match self.registry.get(id) {
            Err(err) => return self.reject(err),
            Ok(player) if !player.on_field => {
                return self.reject(ValidationError::NotOnField(id));
            }
            Ok(_) => {}
        }

        self.push_snapshot();
        let now = self.time.now();
        let player = self.registry.get_mut(id)?;
        player.on_field = false;
        self.fatigue.reset_on_bench(player, now);
        let label = player.label();
        self.log.append(format!("{} moved to the bench.", label), now);

        let suggestion = self
            .registry
            .longest_benched(Some(id))
            .map(|p| Suggestion { player_id: p.id, label: p.label() });

        info!(player_id = id, suggestion = ?suggestion.as_ref().map(|s| s.player_id), "moved to bench");
        self.notify(Notification::PlayerMovedToBench {
            player_id: id,
            suggestion: suggestion.clone(),
        });
        Ok(BenchMove { player_id: id, suggestion })
    }

    // ========================
    // Scoring
    // ========================

    /// `Ok(None)` when the goal does not count: clock stopped or player benched.
    pub fn score_goal(&mut self, id: PlayerId) -> Result<Option<GoalOutcome>> {
        let on_field = match self.registry.get(id) {
            Ok(player) => player.on_field,
            Err(err) => return self.reject(err),
        };
        if !self.clock.is_running() || !on_field {
            debug!(player_id = id, "goal ignored: clock stopped or player benched");
            return Ok(None);
        }

        self.push_snapshot();
        let now = self.time.now();
        let stamp = self.clock.stamp();
        let player = self.registry.get_mut(id)?;
        player.goals += 1;
        let on_fire = self.streak.record_goal(player, stamp);
        let goals = player.goals;
        let label = player.label();

        if on_fire {
            self.log.append(format!("{} scored a goal! They're on fire!", label), now);
        } else {
            self.log.append(format!("{} scored a goal!", label), now);
        }

        info!(player_id = id, goals, on_fire, "goal scored");
        self.notify(Notification::GoalScored { player_id: id, goals, on_fire });
        Ok(Some(GoalOutcome { player_id: id, goals, on_fire, leaderboard: self.leaderboard() }))
    }

    // ========================
    // Clock
    // ========================

    /// `Ok(false)` if the clock was already running.
    pub fn start_clock(&mut self) -> Result<bool> {
        let on_field = self.registry.on_field_count();
        match self.clock.check_start(on_field, self.config.field_capacity) {
            Err(err) => self.reject(err),
            Ok(false) => Ok(false),
            Ok(true) => {
                self.push_snapshot();
                self.clock.start(on_field, self.config.field_capacity)?;
                self.log.append("Timer started.", self.time.now());
                info!(quarter = self.clock.quarter(), remaining = self.clock.quarter_timer(), "clock started");
                Ok(true)
            }
        }
    }

    /// Returns whether the clock was running. Pausing a stopped clock is a no-op.
    pub fn pause_clock(&mut self) -> bool {
        if !self.clock.is_running() {
            return false;
        }
        self.push_snapshot();
        self.clock.pause();
        self.log.append("Timer paused.", self.time.now());
        info!(remaining = self.clock.quarter_timer(), "clock paused");
        true
    }

    /// One second of match time. Driven by the external scheduler.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.clock.tick();
        if outcome == TickOutcome::Idle {
            return outcome;
        }

        let now = self.time.now();
        let mut cooled = Vec::new();
        for player in self.registry.players_mut() {
            self.fatigue.accrue(player);
            if self.streak.tick(player) == StreakTick::CooledDown {
                cooled.push(player.label());
            }
        }
        for label in cooled {
            self.log.append(format!("{} has cooled down.", label), now);
        }

        if let TickOutcome::QuarterEnded { quarter } = outcome {
            self.log.append(format!("End of Quarter {}.", quarter), now);
            info!(quarter, "quarter ended");
            self.notify(Notification::QuarterEnded { quarter });
        }
        outcome
    }

    /// Second phase of a quarter end. Returns the new quarter number.
    pub fn acknowledge_quarter_end(&mut self) -> Result<u32> {
        if self.clock.phase() != ClockPhase::QuarterComplete {
            return Err(StateError::NoQuarterPending.into());
        }
        self.push_snapshot();
        let quarter = self.clock.acknowledge_quarter_end()?;
        self.log.append(format!("Quarter {} ready.", quarter), self.time.now());
        info!(quarter, "quarter advanced");
        Ok(quarter)
    }

    // ========================
    // History / lifecycle
    // ========================

    /// Restore the most recent snapshot. The clock is left stopped.
    pub fn undo(&mut self) -> Result<()> {
        let snapshot = match self.history.pop() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!("undo requested with empty history");
                self.notify(Notification::HistoryEmpty);
                return Err(err.into());
            }
        };

        // the restored clock comes back stopped; no pause snapshot is taken
        self.apply_snapshot(snapshot);
        info!(remaining_history = self.history.len(), "last action undone");
        Ok(())
    }

    /// Fresh roster, clock and log. History is cleared; team name is kept.
    pub fn new_game(&mut self) {
        self.history.clear();
        self.reset_match();
        info!(team = %self.team_name, "new game");
    }

    /// Initial state, including the configured team name.
    pub fn reset_to_initial(&mut self) {
        self.new_game();
        self.team_name = self.config.team_name.clone();
    }

    pub fn set_team_name(&mut self, name: impl Into<String>) {
        self.team_name = name.into();
    }

    // ========================
    // Persistence
    // ========================

    pub fn serialize(&self) -> PersistedState {
        PersistedState {
            players: self.registry.players().to_vec(),
            activity_log: self.log.to_vec(),
            quarter_timer: self.clock.quarter_timer(),
            quarter: self.clock.quarter(),
            team_name: self.team_name.clone(),
        }
    }

    /// Adopt persisted state. An inconsistent shape silently resets to the
    /// initial state instead; returns whether the state was adopted.
    pub fn restore(&mut self, state: PersistedState) -> bool {
        if let Err(err) = state.check(self.config.field_capacity, self.config.quarter_length_secs)
        {
            warn!(%err, "persisted state rejected, starting fresh");
            self.reset_to_initial();
            return false;
        }

        self.history.clear();
        self.pending = None;
        self.registry = PlayerRegistry::from_players(state.players);
        self.log = ActivityLog::from_entries(state.activity_log, self.config.activity_log_capacity);
        self.clock = MatchClock::restored(
            self.config.quarter_length_secs,
            state.quarter_timer,
            state.quarter,
        );
        self.team_name = state.team_name;
        true
    }

    /// Parse and adopt a JSON blob, falling back silently on any error.
    pub fn restore_json(&mut self, json: &str) -> bool {
        match PersistedState::from_json(json) {
            Ok(state) => self.restore(state),
            Err(err) => {
                warn!(%err, "unparseable persisted state, starting fresh");
                self.reset_to_initial();
                false
            }
        }
    }

    // ========================
    // Internals
    // ========================

    /// Field-entry checks shared by every entry path. Returns the current number.
    fn check_field_entry(&self, id: PlayerId) -> std::result::Result<Option<u32>, ValidationError> {
        let player = self.registry.get(id)?;
        if player.on_field {
            return Err(ValidationError::AlreadyOnField(id));
        }
        let capacity = self.config.field_capacity;
        if self.registry.on_field_count() >= capacity {
            return Err(ValidationError::CapacityExceeded { capacity });
        }
        Ok(player.number)
    }

    fn validate_new_number(
        &self,
        id: PlayerId,
        raw: &str,
    ) -> std::result::Result<u32, ValidationError> {
        self.check_field_entry(id)?;
        let number = parse_number(raw)?;
        self.registry.check_number(id, number)?;
        Ok(number)
    }

    fn place_on_field(&mut self, id: PlayerId, number: u32) -> Result<FieldMove> {
        let player = self.registry.get_mut(id)?;
        player.on_field = true;
        player.fatigue = 0;
        self.log.append(format!("Player #{} moved to the field.", number), self.time.now());

        let ready_to_start = self.registry.on_field_count() == self.config.field_capacity
            && self.clock.phase() == ClockPhase::Stopped
            && self.clock.at_quarter_start();

        info!(player_id = id, number, ready_to_start, "moved to field");
        self.notify(Notification::PlayerMovedToField { player_id: id, number, ready_to_start });
        Ok(FieldMove::Moved { player_id: id, number, ready_to_start })
    }

    fn push_snapshot(&mut self) {
        self.history.push(HistorySnapshot {
            players: self.registry.players().to_vec(),
            activity_log: self.log.to_vec(),
            quarter_timer: self.clock.quarter_timer(),
            quarter: self.clock.quarter(),
        });
    }

    fn apply_snapshot(&mut self, snapshot: HistorySnapshot) {
        self.pending = None;
        self.registry = PlayerRegistry::from_players(snapshot.players);
        self.log = ActivityLog::from_entries(snapshot.activity_log, self.config.activity_log_capacity);
        self.clock = MatchClock::restored(
            self.config.quarter_length_secs,
            snapshot.quarter_timer,
            snapshot.quarter,
        );
    }

    fn reset_match(&mut self) {
        let now = self.time.now();
        self.pending = None;
        self.registry = PlayerRegistry::new(self.config.roster_size, now);
        self.clock = MatchClock::new(self.config.quarter_length_secs);
        self.log = ActivityLog::new(self.config.activity_log_capacity);
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn reject<T>(&mut self, err: ValidationError) -> Result<T> {
        debug!(%err, "action rejected");
        if let Some(notification) = Notification::from_rejection(&err) {
            self.notify(notification);
        }
        Err(RotationError::Validation(err))
    }
}
