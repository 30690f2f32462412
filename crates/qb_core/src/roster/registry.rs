use std::cmp::Reverse;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::player::{Player, PlayerId};
use crate::error::ValidationError;
use crate::time_source::Timestamp;

pub type RegistryResult<T> = std::result::Result<T, ValidationError>;

/// Sentinel name shown when the leaderboard has nobody to rank.
pub const NO_LEADER: &str = "N/A";

/// Owns the roster and answers leaderboard queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    /// Fresh roster with ids `1..=size`, everyone on the bench.
    pub fn new(size: u32, now: Timestamp) -> Self {
        Self { players: (1..=size).map(|id| Player::new(id, now)).collect() }
    }

    pub fn from_players(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn into_players(self) -> Vec<Player> {
        self.players
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> RegistryResult<&Player> {
        self.players.iter().find(|p| p.id == id).ok_or(ValidationError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: PlayerId) -> RegistryResult<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id).ok_or(ValidationError::NotFound(id))
    }

    pub fn field_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.on_field)
    }

    pub fn bench_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.on_field)
    }

    pub fn on_field_count(&self) -> usize {
        self.field_players().count()
    }

    /// Validation half of a number assignment.
    pub fn check_number(&self, id: PlayerId, number: u32) -> RegistryResult<()> {
        self.get(id)?;
        if number == 0 {
            return Err(ValidationError::InvalidNumber { input: number.to_string() });
        }
        if let Some(holder) = self.players.iter().find(|p| p.id != id && p.number == Some(number)) {
            return Err(ValidationError::DuplicateNumber { number, holder: holder.id });
        }
        Ok(())
    }

    pub fn assign_number(&mut self, id: PlayerId, number: u32) -> RegistryResult<()> {
        self.check_number(id, number)?;
        self.get_mut(id)?.number = Some(number);
        Ok(())
    }

    /// Longest-benched player other than `excluding`, oldest bench time first.
    pub fn longest_benched(&self, excluding: Option<PlayerId>) -> Option<&Player> {
        self.bench_players()
            .filter(|p| Some(p.id) != excluding)
            .min_by_key(|p| (p.last_bench_time, p.id))
    }

    /// Scoreboard total.
    pub fn team_score(&self) -> u32 {
        self.players.iter().map(|p| p.goals).sum()
    }

    pub fn leaderboard(&self) -> Leaderboard {
        let most_time = self
            .players
            .iter()
            .max_by_key(|p| (p.total_time_on_field, Reverse(p.id)))
            .map(|p| LeaderEntry::for_player(p, p.total_time_on_field))
            .unwrap_or_else(LeaderEntry::sentinel);

        let most_goals = self
            .players
            .iter()
            .max_by_key(|p| (p.goals, Reverse(p.id)))
            .map(|p| LeaderEntry::for_player(p, p.goals))
            .unwrap_or_else(LeaderEntry::sentinel);

        Leaderboard { most_time_on_field: most_time, most_goals }
    }

    /// Structural check used when adopting state from outside the engine.
    pub fn check_consistency(&self, field_capacity: usize) -> std::result::Result<(), String> {
        if self.on_field_count() > field_capacity {
            return Err(format!(
                "{} players on field, capacity {}",
                self.on_field_count(),
                field_capacity
            ));
        }

        let mut ids = HashSet::new();
        let mut numbers = HashSet::new();
        for player in &self.players {
            if !ids.insert(player.id) {
                return Err(format!("duplicate player id {}", player.id));
            }
            if let Some(number) = player.number {
                if number == 0 || !numbers.insert(number) {
                    return Err(format!("invalid or duplicate number {}", number));
                }
            }
            if player.on_fire != player.on_fire_cooldown.is_some() {
                return Err(format!("player {} has inconsistent streak state", player.id));
            }
        }
        Ok(())
    }
}

/// Parse a user-typed shirt number. Must be a positive integer.
pub fn parse_number(raw: &str) -> RegistryResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(ValidationError::InvalidNumber { input: raw.to_string() }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderEntry {
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub value: u32,
}

impl LeaderEntry {
    fn for_player(player: &Player, value: u32) -> Self {
        Self { player_id: Some(player.id), name: player.display_name(), value }
    }

    fn sentinel() -> Self {
        Self { player_id: None, name: NO_LEADER.to_string(), value: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub most_time_on_field: LeaderEntry,
    pub most_goals: LeaderEntry,
}
