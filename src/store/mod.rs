//! Track store: per-device catalogs of uploaded audio.
//!
//! The rotation engine only sees the [`TrackStore`] trait. [`DiskTrackStore`]
//! keeps one directory per device under a storage root.

pub mod disk;
pub mod probe;

use std::time::Duration;

use crate::error::{JukeboxError, Result};
use crate::types::{TrackEntry, TrackRef};

// Re-export commonly used types
pub use disk::DiskTrackStore;
pub use probe::probe_duration;

/// Audio container extensions accepted for upload and listing.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["mp3", "wav", "flac", "ogg", "m4a", "aac"];

/// Catalog access needed by the registry and the rotation engine.
pub trait TrackStore: Send + Sync {
    /// Lists the track ids a device has uploaded.
    ///
    /// Unknown devices yield an empty list, never an error.
    fn list_available(&self, device_id: &str) -> Vec<String>;

    /// Returns the playback duration of a stored track.
    ///
    /// Fails with `MEDIA_ERROR` if the file cannot be read as audio.
    fn duration(&self, device_id: &str, track_id: &str) -> Result<Duration>;

    /// Stores a new track in the device's catalog.
    fn add_track(&self, device_id: &str, filename: &str, bytes: &[u8]) -> Result<TrackEntry>;

    /// Lists devices that have a catalog.
    fn list_devices(&self) -> Vec<String>;

    /// Lists every stored track across all devices.
    fn list_all(&self) -> Vec<TrackRef> {
        self.list_devices()
            .into_iter()
            .flat_map(|device| {
                self.list_available(&device)
                    .into_iter()
                    .map(move |filename| TrackRef::new(device.clone(), filename))
            })
            .collect()
    }
}

/// Returns true if `filename` has an allowed audio extension (case-insensitive).
pub fn is_allowed_audio_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Checks that `value` can be used as a single path component.
pub(crate) fn validate_component(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(JukeboxError::missing_field(field));
    }
    if value == "." || value == ".." || value.contains(&['/', '\\', '\0'][..]) {
        return Err(JukeboxError::invalid_input(format!(
            "{} must not contain path separators: {:?}",
            field, value
        )));
    }
    Ok(())
}
