//! Playlist rotation.
//!
//! Picks the next track for a group from its members' catalogs, highest
//! score first, and replaces expired tracks when a group is read.

pub mod engine;

// Re-export commonly used items
pub use engine::{
    is_rotation_due, rank_members, RefreshOutcome, RotationEngine, Selection,
    MAX_ROTATION_ATTEMPTS,
};
