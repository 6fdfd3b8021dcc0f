//! Player, RotationStat and the registries that hold them.

use crate::models::session::RotationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a player (used in the queue, courts and lookups).
pub type PlayerId = Uuid;

/// Minimum display name length after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// A participant. Identity is the id; names may collide.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    /// Create a player with a fresh id. Fails if the trimmed name is shorter than 2 characters.
    pub fn new(name: &str) -> Result<Self, RotationError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(RotationError::NameTooShort { min: MIN_NAME_LEN });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
        })
    }
}

/// Play history for one player; drives the wait queue ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationStat {
    pub completed_rounds: u32,
    /// True while the player occupies a court.
    pub in_progress: bool,
    /// Accumulated shuttlecock share.
    pub equipment_usage: f64,
    pub last_available_at: DateTime<Utc>,
}

impl RotationStat {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            completed_rounds: 0,
            in_progress: false,
            equipment_usage: 0.0,
            last_available_at: now,
        }
    }

    /// Record the end of a round: back in the pool as of `at`.
    pub fn finish_round(&mut self, at: DateTime<Utc>) {
        self.completed_rounds += 1;
        self.in_progress = false;
        self.last_available_at = at;
    }
}

/// Identity store for participants.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    /// Validate the name and register a new player.
    pub fn create(&mut self, name: &str) -> Result<Player, RotationError> {
        let player = Player::new(name)?;
        self.players.insert(player.id, player.clone());
        Ok(player)
    }

    pub fn get(&self, id: PlayerId) -> Result<&Player, RotationError> {
        self.players
            .get(&id)
            .ok_or(RotationError::PlayerNotFound(id))
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Remove a player. Queue membership is checked by the caller.
    pub fn delete(&mut self, id: PlayerId) -> Result<Player, RotationError> {
        self.players
            .remove(&id)
            .ok_or(RotationError::PlayerNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }
}

/// Per-player counters, keyed like the registry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RotationStats {
    stats: HashMap<PlayerId, RotationStat>,
}

impl RotationStats {
    pub fn insert(&mut self, id: PlayerId, stat: RotationStat) {
        self.stats.insert(id, stat);
    }

    pub fn get(&self, id: PlayerId) -> Option<&RotationStat> {
        self.stats.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Result<&mut RotationStat, RotationError> {
        self.stats
            .get_mut(&id)
            .ok_or(RotationError::PlayerNotFound(id))
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<RotationStat> {
        self.stats.remove(&id)
    }

    /// Fairness sort key: (completed rounds, last available). Unknown ids sort first.
    pub fn fairness_key(&self, id: PlayerId) -> Option<(u32, DateTime<Utc>)> {
        self.stats
            .get(&id)
            .map(|s| (s.completed_rounds, s.last_available_at))
    }
}
