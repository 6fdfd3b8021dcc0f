//! SessionState, its read-only snapshot, and RotationError.

use crate::models::court::{CourtId, CourtPool};
use crate::models::player::{PlayerId, PlayerRegistry, RotationStat, RotationStats};
use crate::models::wait_queue::WaitQueue;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Courts available at session start unless configured otherwise.
pub const DEFAULT_COURT_COUNT: u32 = 2;

/// Errors that can occur during rotation operations.
#[derive(Clone, Debug, PartialEq)]
pub enum RotationError {
    /// Display name shorter than the minimum after trimming.
    NameTooShort { min: usize },
    /// Equipment amount negative or not a finite number.
    InvalidAmount(f64),
    /// Partial release needs exactly two marked occupants.
    SelectionCount { marked: usize },
    /// Equipment can only be recorded for singles (2) or doubles (4).
    EquipmentOccupancy { occupants: usize },
    /// Player exists but is on a court, so cannot be removed from the queue.
    PlayerNotQueued(PlayerId),
    PlayerNotFound(PlayerId),
    CourtNotFound(CourtId),
    /// No occupant at this position on the court.
    PositionNotOccupied { court: CourtId, position: usize },
}

/// Coarse classification of a RotationError, for callers mapping to responses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Capacity,
    State,
    NotFound,
}

impl RotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RotationError::NameTooShort { .. } | RotationError::InvalidAmount(_) => {
                ErrorKind::Validation
            }
            RotationError::SelectionCount { .. } | RotationError::EquipmentOccupancy { .. } => {
                ErrorKind::Capacity
            }
            RotationError::PlayerNotQueued(_) => ErrorKind::State,
            RotationError::PlayerNotFound(_)
            | RotationError::CourtNotFound(_)
            | RotationError::PositionNotOccupied { .. } => ErrorKind::NotFound,
        }
    }
}

impl std::fmt::Display for RotationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationError::NameTooShort { min } => {
                write!(f, "Name must be at least {} characters long", min)
            }
            RotationError::InvalidAmount(amount) => {
                write!(f, "Equipment amount must be a non-negative number (got {})", amount)
            }
            RotationError::SelectionCount { marked } => {
                write!(f, "Select exactly 2 players to release (selected {})", marked)
            }
            RotationError::EquipmentOccupancy { occupants } => write!(
                f,
                "Equipment can only be recorded with 2 or 4 players on court (found {})",
                occupants
            ),
            RotationError::PlayerNotQueued(_) => {
                write!(f, "Player is on a court; release them before removing")
            }
            RotationError::PlayerNotFound(_) => write!(f, "Player not found"),
            RotationError::CourtNotFound(id) => write!(f, "Court {} not found", id),
            RotationError::PositionNotOccupied { court, position } => {
                write!(f, "Court {} has no player at position {}", court, position)
            }
        }
    }
}

impl std::error::Error for RotationError {}

/// Where a player currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerStatus {
    Queued { position: usize },
    Playing { court_id: CourtId },
}

/// Full in-memory session: registry, stats, queue and courts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub players: PlayerRegistry,
    pub stats: RotationStats,
    pub queue: WaitQueue,
    pub courts: CourtPool,
    /// Last timestamp handed out; stamps are strictly increasing.
    last_stamp: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_COURT_COUNT)
    }
}

impl SessionState {
    /// Empty queue and `court_count` empty courts.
    pub fn new(court_count: u32) -> Self {
        Self {
            players: PlayerRegistry::default(),
            stats: RotationStats::default(),
            queue: WaitQueue::new(),
            courts: CourtPool::with_courts(court_count),
            last_stamp: None,
        }
    }

    /// Next availability timestamp: `now`, or one microsecond past the last stamp
    /// if the clock has not moved.
    pub fn next_stamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    pub fn status_of(&self, player_id: PlayerId) -> Result<PlayerStatus, RotationError> {
        if let Some(position) = self.queue.position(player_id) {
            return Ok(PlayerStatus::Queued { position });
        }
        self.courts
            .court_of(player_id)
            .map(|court_id| PlayerStatus::Playing { court_id })
            .ok_or(RotationError::PlayerNotFound(player_id))
    }

    pub fn player_summary(&self, player_id: PlayerId) -> Result<PlayerSummary, RotationError> {
        let player = self.players.get(player_id)?;
        let stat = self
            .stats
            .get(player_id)
            .cloned()
            .ok_or(RotationError::PlayerNotFound(player_id))?;
        Ok(PlayerSummary {
            id: player.id,
            name: player.name.clone(),
            status: self.status_of(player_id)?,
            stats: stat,
        })
    }

    /// Read-only view for rendering. Players are listed queue first, then court by court.
    pub fn snapshot(&self) -> SessionSnapshot {
        let ordered = self
            .queue
            .ids()
            .iter()
            .chain(self.courts.iter().flat_map(|c| c.occupants.iter()));
        SessionSnapshot {
            players: ordered
                .filter_map(|&id| self.player_summary(id).ok())
                .collect(),
            queue: self.queue.ids().to_vec(),
            courts: self
                .courts
                .iter()
                .map(|c| CourtView {
                    id: c.id,
                    capacity: c.capacity,
                    occupants: c.occupants.clone(),
                    marked: c.marked.clone(),
                })
                .collect(),
        }
    }

    /// Check the placement, capacity and ordering invariants. Used by tests and debug assertions.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for id in self.queue.ids() {
            if !seen.insert(*id) {
                return Err(format!("player {} placed twice", id));
            }
        }
        for court in self.courts.iter() {
            if court.occupants.len() > court.capacity {
                return Err(format!("court {} over capacity", court.id));
            }
            for id in &court.occupants {
                if !seen.insert(*id) {
                    return Err(format!("player {} placed twice", id));
                }
            }
        }
        if seen.len() != self.players.len() || self.players.iter().any(|p| !seen.contains(&p.id)) {
            return Err("registered players and placed players differ".to_string());
        }
        let keys: Vec<_> = self
            .queue
            .ids()
            .iter()
            .map(|&id| self.stats.fairness_key(id))
            .collect();
        if keys.windows(2).any(|w| w[0] > w[1]) {
            return Err("queue is not in fairness order".to_string());
        }
        Ok(())
    }
}

/// One player with stats and current status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    pub stats: RotationStat,
}

/// Court as shown to clients.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CourtView {
    pub id: CourtId,
    pub capacity: usize,
    pub occupants: Vec<PlayerId>,
    pub marked: BTreeSet<usize>,
}

/// Everything a view layer needs to render the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub players: Vec<PlayerSummary>,
    pub queue: Vec<PlayerId>,
    pub courts: Vec<CourtView>,
}
