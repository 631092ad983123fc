//! Track types: catalog entries and the now-playing reference.
//!
//! A [`TrackRef`] names a stored audio file by device id and filename.
//! [`NowPlaying`] is the group's current selection with its computed end time.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Pointer to a stored audio file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    /// Device whose catalog holds the file.
    pub device_id: String,
    /// Filename within the device catalog.
    pub filename: String,
}

impl TrackRef {
    pub fn new(device_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            filename: filename.into(),
        }
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.filename)
    }
}

/// A catalog entry with its probed duration.
///
/// Durations are recomputed from file content on every read; this value is
/// a snapshot, never a cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub device_id: String,
    pub filename: String,
    /// Playback duration in milliseconds.
    #[serde(rename = "duration_ms", with = "duration_ms_serde")]
    pub duration: Duration,
}

/// The track a group is currently playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    #[serde(flatten)]
    pub track: TrackRef,

    /// When the track was selected.
    #[serde(rename = "started_at_ms", with = "system_time_ms_serde")]
    pub started_at: SystemTime,

    /// Selection time plus track duration.
    #[serde(rename = "ends_at_ms", with = "system_time_ms_serde")]
    pub ends_at: SystemTime,
}

impl NowPlaying {
    /// Starts `track` at `now`, ending after `duration`.
    ///
    /// Panics if the end time overflows `SystemTime`; the rotation engine
    /// rejects such durations before starting a track.
    pub fn start(track: TrackRef, now: SystemTime, duration: Duration) -> Self {
        Self {
            track,
            started_at: now,
            ends_at: now + duration,
        }
    }

    /// Returns true once `now` has reached the end time.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.ends_at
    }

    /// Time left before expiry, zero if already expired.
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.ends_at.duration_since(now).unwrap_or(Duration::ZERO)
    }
}

/// Serializes `SystemTime` as integer Unix milliseconds.
pub(crate) mod system_time_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

/// Serializes `Duration` as integer milliseconds.
pub(crate) mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
