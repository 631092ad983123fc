//! jukebox-daemon: coordination service for a shared group jukebox.
//!
//! Clients create or join a group by code, upload audio from their device,
//! and the daemon decides whose track plays next based on member scores.
//! Rotation is lazy: an expired track is replaced when the group is read.
//!
//! # Modules
//!
//! - [`registry`]: Group lifecycle (GroupRegistry)
//! - [`rotation`]: Next-track selection (RotationEngine)
//! - [`store`]: Per-device track catalogs (TrackStore, DiskTrackStore)
//! - [`types`]: Core data types (Group, Member, NowPlaying)
//! - [`config`]: Runtime configuration (JukeboxConfig, ScorePolicy)
//! - [`error`]: Error types and codes (JukeboxError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::SystemTime;
//! use jukebox_daemon::{DiskTrackStore, GroupRegistry, RotationEngine, ScorePolicy};
//!
//! let store = Arc::new(DiskTrackStore::open("/var/lib/jukebox")?);
//! let registry = GroupRegistry::new(RotationEngine::new(store, ScorePolicy::Keep, None));
//!
//! let group = registry.create_group();
//! registry.join_group(&group.code, "phone-1", "Alice", SystemTime::now())?;
//! let group = registry.get_group(&group.code, SystemTime::now())?;
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod rotation;
pub mod rpc;
pub mod store;
pub mod sweep;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{JukeboxConfig, ScorePolicy};
pub use error::{ErrorCode, JukeboxError, Result};
pub use registry::{GroupPlaylist, GroupRegistry, CODE_LENGTH};
pub use rotation::RotationEngine;
pub use store::{is_allowed_audio_file, DiskTrackStore, TrackStore};
pub use types::{Group, Member, NowPlaying, TrackEntry, TrackRef};
