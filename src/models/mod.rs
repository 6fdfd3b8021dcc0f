//! Data structures for a court rotation session: players, stats, queue, courts.

mod court;
mod player;
mod session;
mod wait_queue;

pub use court::{Court, CourtId, CourtPool, ReleaseMode, COURT_CAPACITY, SELECTED_RELEASE_COUNT};
pub use player::{Player, PlayerId, PlayerRegistry, RotationStat, RotationStats, MIN_NAME_LEN};
pub use session::{
    CourtView, ErrorKind, PlayerStatus, PlayerSummary, RotationError, SessionSnapshot,
    SessionState, DEFAULT_COURT_COUNT,
};
pub use wait_queue::{fairness_order, WaitQueue};
