//! Filesystem-backed track store.
//!
//! Layout: `<root>/<device_id>/<filename>`. A device directory is created the
//! first time the device is listed or uploads a track.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::probe::probe_duration;
use super::{is_allowed_audio_file, validate_component, TrackStore};
use crate::error::{JukeboxError, Result};
use crate::types::TrackEntry;

/// Track store keeping one directory per device under a root path.
#[derive(Debug, Clone)]
pub struct DiskTrackStore {
    root: PathBuf,
}

impl DiskTrackStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            JukeboxError::storage(format!("Failed to create {}", root.display()), e)
        })?;
        Ok(Self { root })
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the catalog directory for a device, creating it lazily.
    fn device_dir(&self, device_id: &str) -> Result<PathBuf> {
        validate_component("device_id", device_id)?;
        let dir = self.root.join(device_id);
        fs::create_dir_all(&dir).map_err(|e| {
            JukeboxError::storage(format!("Failed to create {}", dir.display()), e)
        })?;
        Ok(dir)
    }

    fn track_path(&self, device_id: &str, track_id: &str) -> Result<PathBuf> {
        validate_component("device_id", device_id)?;
        validate_component("filename", track_id)?;
        Ok(self.root.join(device_id).join(track_id))
    }
}

impl TrackStore for DiskTrackStore {
    fn list_available(&self, device_id: &str) -> Vec<String> {
        let dir = match self.device_dir(device_id) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(device_id, error = %e, "Cannot open device catalog");
                return Vec::new();
            }
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot list device catalog");
                return Vec::new();
            }
        };

        let mut tracks: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_allowed_audio_file(name))
            .collect();
        tracks.sort();
        tracks
    }

    fn duration(&self, device_id: &str, track_id: &str) -> Result<Duration> {
        let path = self
            .track_path(device_id, track_id)
            .map_err(|e| JukeboxError::media(device_id, track_id, e.message))?;
        probe_duration(&path)
    }

    fn add_track(&self, device_id: &str, filename: &str, bytes: &[u8]) -> Result<TrackEntry> {
        validate_component("filename", filename)?;
        if !is_allowed_audio_file(filename) {
            return Err(JukeboxError::invalid_input(format!(
                "Unsupported file type: {} (allowed: {})",
                filename,
                super::ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let path = self.device_dir(device_id)?.join(filename);
        fs::write(&path, bytes).map_err(|e| {
            JukeboxError::storage(format!("Failed to write {}", path.display()), e)
        })?;

        match probe_duration(&path) {
            Ok(duration) => {
                debug!(device_id, filename, ?duration, "Stored track");
                Ok(TrackEntry {
                    device_id: device_id.to_string(),
                    filename: filename.to_string(),
                    duration,
                })
            }
            Err(e) => {
                // Unplayable uploads are not kept in the catalog
                if let Err(rm) = fs::remove_file(&path) {
                    warn!(
                        path = %path.display(),
                        error = %rm,
                        "Failed to remove unreadable upload"
                    );
                }
                Err(e)
            }
        }
    }

    fn list_devices(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.root.display(), error = %e, "Cannot list storage root");
                return Vec::new();
            }
        };

        let mut devices: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        devices.sort();
        devices
    }
}
