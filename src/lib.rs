//! Court rotation: fair allocation of a waiting pool of players to a fixed set of courts.

pub mod config;
pub mod export;
pub mod logic;
pub mod models;
pub mod persistence;
pub mod web;

pub use config::AppConfig;
pub use logic::{
    assign_to_court, enqueue_new_player, increment_equipment_usage, release_from_court,
    remove_from_queue, toggle_selection, transition, AllocationEngine, Operation, Outcome,
};
pub use models::{
    Court, CourtId, CourtPool, ErrorKind, Player, PlayerId, PlayerRegistry, PlayerStatus,
    PlayerSummary, ReleaseMode, RotationError, RotationStat, RotationStats, SessionSnapshot,
    SessionState, WaitQueue,
};
