//! Court operations: marking, assigning from the queue, releasing, equipment.

use crate::models::{CourtId, PlayerId, ReleaseMode, RotationError, SessionState};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Flip the release mark on an occupant position. Returns the court's mark count.
pub fn toggle_selection(
    state: &mut SessionState,
    court_id: CourtId,
    position: usize,
) -> Result<usize, RotationError> {
    state.courts.toggle_mark(court_id, position)
}

/// Fill free slots on a court.
///
/// With `explicit_ids`, those players are candidates in the given order; ids that are
/// not currently queued (or repeated) are skipped. Without, the front of the queue is used.
/// Returns the placed ids; an empty result means nothing changed.
pub fn assign_to_court(
    state: &mut SessionState,
    court_id: CourtId,
    explicit_ids: &[PlayerId],
) -> Result<Vec<PlayerId>, RotationError> {
    let available = state.courts.get(court_id)?.available_slots();
    let candidates: Vec<PlayerId> = if explicit_ids.is_empty() {
        state.queue.peek_front(available)
    } else {
        let mut seen = HashSet::new();
        explicit_ids
            .iter()
            .copied()
            .filter(|&id| state.queue.contains(id) && seen.insert(id))
            .collect()
    };
    if candidates.is_empty() || available == 0 {
        return Ok(Vec::new());
    }
    let placed = state.courts.assign(court_id, &candidates, &mut state.stats)?;
    for &id in &placed {
        state.queue.remove(id);
    }
    Ok(placed)
}

/// Send occupants back to the queue, crediting each with a completed round.
///
/// Released players get strictly increasing availability stamps in release order, so
/// players tied on rounds keep the order they left the court in.
pub fn release_from_court(
    state: &mut SessionState,
    court_id: CourtId,
    mode: ReleaseMode,
    now: DateTime<Utc>,
) -> Result<Vec<PlayerId>, RotationError> {
    let released = state.courts.release(court_id, mode, &mut state.stats)?;
    for &id in &released {
        let stamp = state.next_stamp(now);
        state.stats.get_mut(id)?.finish_round(stamp);
        state.queue.push_unsorted(id);
    }
    state.queue.reorder(&state.stats);
    Ok(released)
}

/// Add `amount` to the equipment usage of everyone on the court.
///
/// Only allowed for singles (2 on court) or doubles (4 on court).
pub fn increment_equipment_usage(
    state: &mut SessionState,
    court_id: CourtId,
    amount: f64,
) -> Result<Vec<PlayerId>, RotationError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(RotationError::InvalidAmount(amount));
    }
    let occupants = state.courts.get(court_id)?.occupants.clone();
    if occupants.len() != 2 && occupants.len() != 4 {
        return Err(RotationError::EquipmentOccupancy {
            occupants: occupants.len(),
        });
    }
    for &id in &occupants {
        state.stats.get_mut(id)?.equipment_usage += amount;
    }
    Ok(occupants)
}

/// One shuttlecock shared by the current occupants, or None if equipment cannot be recorded.
pub fn shared_equipment_amount(state: &SessionState, court_id: CourtId) -> Result<Option<f64>, RotationError> {
    let occupants = state.courts.get(court_id)?.occupants.len();
    Ok(match occupants {
        2 | 4 => Some(1.0 / occupants as f64),
        _ => None,
    })
}
