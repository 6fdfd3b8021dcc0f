//! Joining and leaving the wait queue.

use crate::models::{Player, PlayerId, RotationError, RotationStat, SessionState};
use chrono::{DateTime, Utc};

/// Register a new player and put them in the queue as of `now`.
pub fn enqueue_new_player(
    state: &mut SessionState,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Player, RotationError> {
    let player = state.players.create(name)?;
    let stamp = state.next_stamp(now);
    state.stats.insert(player.id, RotationStat::new(stamp));
    state.queue.insert(player.id, &state.stats);
    Ok(player)
}

/// Remove a queued player from the session entirely (queue, registry, stats).
///
/// A player on a court must be released first.
pub fn remove_from_queue(
    state: &mut SessionState,
    player_id: PlayerId,
) -> Result<Player, RotationError> {
    state.players.get(player_id)?;
    if !state.queue.remove(player_id) {
        return Err(RotationError::PlayerNotQueued(player_id));
    }
    state.stats.remove(player_id);
    state.players.delete(player_id)
}
