//! Bounded undo stack of previous spins.

use std::collections::VecDeque;

use roulette_schema::SerializedSpin;

use crate::catalog::Catalog;
use crate::spin::Spin;

pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SpinHistory {
    entries: VecDeque<Spin>,
    capacity: usize,
}

impl Default for SpinHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SpinHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push a spin, evicting the oldest entry once full.
    pub fn push(&mut self, spin: Spin) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(spin);
    }

    pub fn pop(&mut self) -> Option<Spin> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&Spin> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Spin> {
        self.entries.iter()
    }

    pub fn to_serialized(&self) -> Vec<SerializedSpin> {
        self.entries.iter().map(Spin::to_serialized).collect()
    }

    /// Rebuild from persisted spins, dropping what no longer resolves.
    ///
    /// Returns the history plus the number of condition entries and whole
    /// spins that were dropped.
    pub fn from_serialized(
        catalog: &Catalog,
        spins: &[SerializedSpin],
        capacity: usize,
    ) -> (Self, usize) {
        let mut history = Self::with_capacity(capacity);
        let mut dropped = 0;
        for serialized in spins {
            match Spin::from_serialized(catalog, serialized) {
                Some((spin, lost)) => {
                    dropped += lost;
                    history.push(spin);
                }
                None => dropped += serialized.conditions.len().max(1),
            }
        }
        (history, dropped)
    }
}
