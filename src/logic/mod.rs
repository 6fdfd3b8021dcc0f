//! Rotation logic: queue membership, court operations, and the engine that serializes them.

mod courts;
mod engine;
mod queue;

pub use courts::{
    assign_to_court, increment_equipment_usage, release_from_court, shared_equipment_amount,
    toggle_selection,
};
pub use engine::{transition, AllocationEngine, Operation, Outcome};
pub use queue::{enqueue_new_player, remove_from_queue};
