//! WaitQueue: players waiting for a court, kept in fairness order.

use crate::models::player::{PlayerId, RotationStats};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered sequence of waiting player ids (no duplicates).
///
/// Order after every mutation:
/// 1. Players with no completed round come first, however long the others waited.
/// 2. Among those, earlier `last_available_at` first.
/// 3. Everyone else by ascending `completed_rounds`, then earlier `last_available_at`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaitQueue {
    ids: Vec<PlayerId>,
}

/// Compare two players under the fairness order.
pub fn fairness_order(stats: &RotationStats, a: PlayerId, b: PlayerId) -> Ordering {
    match (stats.fairness_key(a), stats.fairness_key(b)) {
        (Some((rounds_a, at_a)), Some((rounds_b, at_b))) => {
            let fresh_a = rounds_a == 0;
            let fresh_b = rounds_b == 0;
            match (fresh_a, fresh_b) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (true, true) => at_a.cmp(&at_b),
                (false, false) => rounds_a.cmp(&rounds_b).then(at_a.cmp(&at_b)),
            }
        }
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the id (ignored if already queued) and re-sort.
    pub fn insert(&mut self, id: PlayerId, stats: &RotationStats) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self.reorder(stats);
    }

    /// Append without sorting; callers batching inserts must call `reorder` afterwards.
    pub(crate) fn push_unsorted(&mut self, id: PlayerId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Remove the id. Returns false if it was not queued.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        match self.ids.iter().position(|&x| x == id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    /// First `n` ids, front of the queue first.
    pub fn peek_front(&self, n: usize) -> Vec<PlayerId> {
        self.ids.iter().take(n).copied().collect()
    }

    /// Re-apply the fairness order. Stable, so idempotent.
    pub fn reorder(&mut self, stats: &RotationStats) {
        self.ids.sort_by(|&a, &b| fairness_order(stats, a, b));
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.ids.contains(&id)
    }

    pub fn position(&self, id: PlayerId) -> Option<usize> {
        self.ids.iter().position(|&x| x == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[PlayerId] {
        &self.ids
    }
}
