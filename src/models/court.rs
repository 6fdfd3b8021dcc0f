//! Court, ReleaseMode and the fixed CourtPool.

use crate::models::player::{PlayerId, RotationStats};
use crate::models::session::RotationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Court number (1-based, stable for the session).
pub type CourtId = u32;

/// Players per court (doubles).
pub const COURT_CAPACITY: usize = 4;

/// Marks required for a partial release.
pub const SELECTED_RELEASE_COUNT: usize = 2;

/// How many occupants to send back to the queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMode {
    /// Exactly the two marked occupants.
    Selected,
    /// Everyone on the court.
    All,
}

/// A court and who is on it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub id: CourtId,
    pub capacity: usize,
    /// Occupants in assignment order.
    pub occupants: Vec<PlayerId>,
    /// Occupant positions marked for the next partial release.
    pub marked: BTreeSet<usize>,
}

impl Court {
    pub fn new(id: CourtId) -> Self {
        Self {
            id,
            capacity: COURT_CAPACITY,
            occupants: Vec::new(),
            marked: BTreeSet::new(),
        }
    }

    pub fn available_slots(&self) -> usize {
        self.capacity.saturating_sub(self.occupants.len())
    }

    pub fn is_full(&self) -> bool {
        self.available_slots() == 0
    }
}

/// Fixed set of courts. Only occupants and marks ever change.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourtPool {
    courts: Vec<Court>,
}

impl CourtPool {
    /// Courts numbered 1..=count, all empty.
    pub fn with_courts(count: u32) -> Self {
        Self {
            courts: (1..=count).map(Court::new).collect(),
        }
    }

    pub fn get(&self, court_id: CourtId) -> Result<&Court, RotationError> {
        self.courts
            .iter()
            .find(|c| c.id == court_id)
            .ok_or(RotationError::CourtNotFound(court_id))
    }

    fn get_mut(&mut self, court_id: CourtId) -> Result<&mut Court, RotationError> {
        self.courts
            .iter_mut()
            .find(|c| c.id == court_id)
            .ok_or(RotationError::CourtNotFound(court_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Court> {
        self.courts.iter()
    }

    /// Court currently holding the player, if any.
    pub fn court_of(&self, player_id: PlayerId) -> Option<CourtId> {
        self.courts
            .iter()
            .find(|c| c.occupants.contains(&player_id))
            .map(|c| c.id)
    }

    /// Flip the release mark at an occupant position. Returns the new mark count.
    pub fn toggle_mark(&mut self, court_id: CourtId, position: usize) -> Result<usize, RotationError> {
        let court = self.get_mut(court_id)?;
        if position >= court.occupants.len() {
            return Err(RotationError::PositionNotOccupied {
                court: court_id,
                position,
            });
        }
        if !court.marked.remove(&position) {
            court.marked.insert(position);
        }
        Ok(court.marked.len())
    }

    pub fn marked_count(&self, court_id: CourtId) -> Result<usize, RotationError> {
        Ok(self.get(court_id)?.marked.len())
    }

    /// Place candidates on the court, front first, up to the free slots.
    /// Returns the ids actually placed (empty if the court is full).
    pub fn assign(
        &mut self,
        court_id: CourtId,
        candidates: &[PlayerId],
        stats: &mut RotationStats,
    ) -> Result<Vec<PlayerId>, RotationError> {
        let court = self.get_mut(court_id)?;
        let available = court.available_slots();
        if available == 0 {
            return Ok(Vec::new());
        }
        let placed: Vec<PlayerId> = candidates.iter().take(available).copied().collect();
        for &id in &placed {
            stats.get_mut(id)?.in_progress = true;
        }
        court.occupants.extend(placed.iter().copied());
        court.marked.clear();
        Ok(placed)
    }

    /// Take occupants off the court. Returns them in their prior occupant order.
    ///
    /// `Selected` needs exactly two marks and leaves the court untouched otherwise.
    pub fn release(
        &mut self,
        court_id: CourtId,
        mode: ReleaseMode,
        stats: &mut RotationStats,
    ) -> Result<Vec<PlayerId>, RotationError> {
        let court = self.get_mut(court_id)?;
        let released = match mode {
            ReleaseMode::Selected => {
                if court.marked.len() != SELECTED_RELEASE_COUNT {
                    return Err(RotationError::SelectionCount {
                        marked: court.marked.len(),
                    });
                }
                let (released, remaining): (Vec<_>, Vec<_>) = court
                    .occupants
                    .iter()
                    .enumerate()
                    .partition(|(pos, _)| court.marked.contains(pos));
                let released: Vec<PlayerId> = released.into_iter().map(|(_, &id)| id).collect();
                court.occupants = remaining.into_iter().map(|(_, &id)| id).collect();
                for &id in &court.occupants {
                    stats.get_mut(id)?.in_progress = true;
                }
                released
            }
            ReleaseMode::All => std::mem::take(&mut court.occupants),
        };
        court.marked.clear();
        Ok(released)
    }
}
