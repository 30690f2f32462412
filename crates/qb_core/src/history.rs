//! Bounded undo stack of full-state snapshots.
//!
//! Snapshots are deep copies. At a roster of eight this is a handful of
//! small structs per action.

use std::collections::VecDeque;

use crate::activity_log::ActivityEntry;
use crate::error::StateError;
use crate::roster::Player;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub players: Vec<Player>,
    pub activity_log: Vec<ActivityEntry>,
    pub quarter_timer: u32,
    pub quarter: u32,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    stack: VecDeque<HistorySnapshot>,
    depth: usize,
}

impl HistoryManager {
    pub fn new(depth: usize) -> Self {
        Self { stack: VecDeque::with_capacity(depth + 1), depth }
    }

    /// Push, evicting the oldest snapshot past the depth limit.
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        if self.depth == 0 {
            return;
        }
        self.stack.push_back(snapshot);
        while self.stack.len() > self.depth {
            self.stack.pop_front();
        }
    }

    pub fn pop(&mut self) -> Result<HistorySnapshot, StateError> {
        self.stack.pop_back().ok_or(StateError::HistoryEmpty)
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
