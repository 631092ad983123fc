//! Core types for the jukebox daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`Group`]: A playback session with members and a current track
//! - [`Member`]: A device in a group, with display name and score
//! - [`TrackRef`], [`TrackEntry`], [`NowPlaying`]: Stored tracks and the current selection

mod group;
mod track;

// Re-export all types at the module level
pub use group::{Group, Member};
pub(crate) use group::lock_group;
pub use track::{NowPlaying, TrackEntry, TrackRef};
