//! AllocationEngine: the single owner of session state and the only way to change it.

use crate::logic::courts::{
    assign_to_court, increment_equipment_usage, release_from_court, toggle_selection,
};
use crate::logic::queue::{enqueue_new_player, remove_from_queue};
use crate::models::{
    CourtId, Player, PlayerId, ReleaseMode, RotationError, SessionSnapshot, SessionState,
};
use crate::persistence::{self, StoreSync};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every mutation a caller can request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    EnqueueNewPlayer { name: String },
    RemoveFromQueue { player_id: PlayerId },
    ToggleSelection { court_id: CourtId, position: usize },
    AssignToCourt {
        court_id: CourtId,
        #[serde(default)]
        player_ids: Vec<PlayerId>,
    },
    ReleaseFromCourt { court_id: CourtId, mode: ReleaseMode },
    IncrementEquipmentUsage { court_id: CourtId, amount: f64 },
}

/// What a committed operation did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Enqueued { player: Player },
    Removed { player: Player },
    SelectionToggled { court_id: CourtId, marked: usize },
    /// Empty when the court was full or nobody was eligible.
    Assigned { court_id: CourtId, player_ids: Vec<PlayerId> },
    Released { court_id: CourtId, player_ids: Vec<PlayerId> },
    EquipmentRecorded { court_id: CourtId, player_ids: Vec<PlayerId> },
}

/// Apply one operation to `state` in place. May leave `state` half-updated on error;
/// use `transition` (or the engine) for all-or-nothing semantics.
fn apply(
    state: &mut SessionState,
    op: &Operation,
    now: DateTime<Utc>,
) -> Result<Outcome, RotationError> {
    Ok(match op {
        Operation::EnqueueNewPlayer { name } => Outcome::Enqueued {
            player: enqueue_new_player(state, name, now)?,
        },
        Operation::RemoveFromQueue { player_id } => Outcome::Removed {
            player: remove_from_queue(state, *player_id)?,
        },
        Operation::ToggleSelection { court_id, position } => Outcome::SelectionToggled {
            court_id: *court_id,
            marked: toggle_selection(state, *court_id, *position)?,
        },
        Operation::AssignToCourt {
            court_id,
            player_ids,
        } => Outcome::Assigned {
            court_id: *court_id,
            player_ids: assign_to_court(state, *court_id, player_ids)?,
        },
        Operation::ReleaseFromCourt { court_id, mode } => Outcome::Released {
            court_id: *court_id,
            player_ids: release_from_court(state, *court_id, *mode, now)?,
        },
        Operation::IncrementEquipmentUsage { court_id, amount } => Outcome::EquipmentRecorded {
            court_id: *court_id,
            player_ids: increment_equipment_usage(state, *court_id, *amount)?,
        },
    })
}

/// Pure transition: `(state, operation) -> (new state, outcome)`. `state` is never touched.
pub fn transition(
    state: &SessionState,
    op: &Operation,
    now: DateTime<Utc>,
) -> Result<(SessionState, Outcome), RotationError> {
    let mut next = state.clone();
    let outcome = apply(&mut next, op, now)?;
    Ok((next, outcome))
}

/// Owns the session and serializes every change through `transition`.
///
/// Committed changes are mirrored to the store (if any) after the in-memory commit;
/// the mirror is best-effort and never rolls anything back.
#[derive(Debug)]
pub struct AllocationEngine {
    state: SessionState,
    sync: Option<StoreSync>,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::from_state(SessionState::default())
    }
}

impl AllocationEngine {
    /// Empty queue and `court_count` empty courts.
    pub fn new(court_count: u32) -> Self {
        Self::from_state(SessionState::new(court_count))
    }

    pub fn from_state(state: SessionState) -> Self {
        Self { state, sync: None }
    }

    /// Mirror committed changes through `sync`. The full current state is sent first.
    pub fn with_sync(mut self, sync: StoreSync) -> Self {
        sync.send(persistence::diff(&SessionState::new(0), &self.state));
        self.sync = Some(sync);
        self
    }

    /// Stop mirroring. Dropping the returned sender lets the mirror thread drain and exit.
    pub fn take_sync(&mut self) -> Option<StoreSync> {
        self.sync.take()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Run an operation stamped with the current time.
    pub fn execute(&mut self, op: Operation) -> Result<Outcome, RotationError> {
        self.execute_at(op, Utc::now())
    }

    /// Run an operation as of `now`. Either fully committed or no change at all.
    pub fn execute_at(&mut self, op: Operation, now: DateTime<Utc>) -> Result<Outcome, RotationError> {
        let op = &op;
        self.run(op, now, |state, now| apply(state, op, now))
    }

    /// Apply `f` to a working copy and commit it only if `f` succeeds.
    fn run<T: std::fmt::Debug>(
        &mut self,
        op: &Operation,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut SessionState, DateTime<Utc>) -> Result<T, RotationError>,
    ) -> Result<T, RotationError> {
        let mut next = self.state.clone();
        match f(&mut next, now) {
            Ok(out) => {
                log::debug!("Committed {:?} -> {:?}", op, out);
                self.commit(next);
                Ok(out)
            }
            Err(e) => {
                log::info!("Rejected {:?}: {}", op, e);
                Err(e)
            }
        }
    }

    fn commit(&mut self, next: SessionState) {
        debug_assert_eq!(next.check_invariants(), Ok(()));
        if let Some(sync) = &self.sync {
            sync.send(persistence::diff(&self.state, &next));
        }
        self.state = next;
    }

    pub fn enqueue_new_player(&mut self, name: &str) -> Result<Player, RotationError> {
        let op = Operation::EnqueueNewPlayer {
            name: name.to_string(),
        };
        self.run(&op, Utc::now(), |state, now| enqueue_new_player(state, name, now))
    }

    pub fn remove_from_queue(&mut self, player_id: PlayerId) -> Result<Player, RotationError> {
        let op = Operation::RemoveFromQueue { player_id };
        self.run(&op, Utc::now(), |state, _| remove_from_queue(state, player_id))
    }

    /// Returns the court's mark count after the toggle.
    pub fn toggle_selection(&mut self, court_id: CourtId, position: usize) -> Result<usize, RotationError> {
        let op = Operation::ToggleSelection { court_id, position };
        self.run(&op, Utc::now(), |state, _| {
            toggle_selection(state, court_id, position)
        })
    }

    /// Returns the ids placed; empty if the court was full or nobody was eligible.
    pub fn assign_to_court(
        &mut self,
        court_id: CourtId,
        player_ids: &[PlayerId],
    ) -> Result<Vec<PlayerId>, RotationError> {
        let op = Operation::AssignToCourt {
            court_id,
            player_ids: player_ids.to_vec(),
        };
        self.run(&op, Utc::now(), |state, _| {
            assign_to_court(state, court_id, player_ids)
        })
    }

    /// Returns the released ids in their prior court order.
    pub fn release_from_court(
        &mut self,
        court_id: CourtId,
        mode: ReleaseMode,
    ) -> Result<Vec<PlayerId>, RotationError> {
        let op = Operation::ReleaseFromCourt { court_id, mode };
        self.run(&op, Utc::now(), |state, now| {
            release_from_court(state, court_id, mode, now)
        })
    }

    pub fn increment_equipment_usage(
        &mut self,
        court_id: CourtId,
        amount: f64,
    ) -> Result<Vec<PlayerId>, RotationError> {
        let op = Operation::IncrementEquipmentUsage { court_id, amount };
        self.run(&op, Utc::now(), |state, _| {
            increment_equipment_usage(state, court_id, amount)
        })
    }
}
