//! Daemon configuration module.
//!
//! Contains the runtime configuration for the jukebox daemon: where uploaded
//! tracks live, how scores behave on rotation, the RNG seed and the optional
//! sweep interval.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What happens to member scores when a rotation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    /// Scores are left untouched by rotation.
    #[default]
    Keep,

    /// Every member's score is set to 0 when a new track is selected.
    Reset,
}

impl ScorePolicy {
    /// Returns the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorePolicy::Keep => "keep",
            ScorePolicy::Reset => "reset",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Some(ScorePolicy::Keep),
            "reset" | "reset-on-rotation" => Some(ScorePolicy::Reset),
            _ => None,
        }
    }

    /// Returns true if rotation should zero all scores.
    pub fn resets_scores(&self) -> bool {
        matches!(self, ScorePolicy::Reset)
    }
}

impl std::fmt::Display for ScorePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for the daemon.
///
/// Loaded from environment variables at startup, then overridden by
/// command-line arguments.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JukeboxConfig {
    /// Root directory holding one catalog directory per device.
    /// If None, uses the platform-specific default data location.
    pub storage_path: Option<PathBuf>,

    /// Score behavior on rotation.
    pub score_policy: ScorePolicy,

    /// Seed for the rotation RNG. If None, seeded from OS entropy.
    pub seed: Option<u64>,

    /// Interval between background sweeps in seconds.
    /// If None, rotation only happens when a group is read.
    pub sweep_interval_secs: Option<u64>,
}

impl JukeboxConfig {
    /// Creates a new JukeboxConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a JukeboxConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `JUKEBOX_STORAGE_PATH` - Root directory for uploaded tracks
    /// - `JUKEBOX_SCORE_POLICY` - Score behavior on rotation (keep, reset)
    /// - `JUKEBOX_SEED` - Seed for reproducible track selection
    /// - `JUKEBOX_SWEEP_INTERVAL` - Background sweep interval in seconds
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("JUKEBOX_STORAGE_PATH") {
            config.storage_path = Some(PathBuf::from(path));
        }

        if let Ok(policy_str) = std::env::var("JUKEBOX_SCORE_POLICY") {
            if let Some(policy) = ScorePolicy::parse(&policy_str) {
                config.score_policy = policy;
            }
        }

        if let Ok(seed_str) = std::env::var("JUKEBOX_SEED") {
            if let Ok(seed) = seed_str.parse::<u64>() {
                config.seed = Some(seed);
            }
        }

        if let Ok(interval_str) = std::env::var("JUKEBOX_SWEEP_INTERVAL") {
            if let Ok(interval) = interval_str.parse::<u64>() {
                if interval > 0 {
                    config.sweep_interval_secs = Some(interval);
                }
            }
        }

        config
    }

    /// Returns the effective storage path, using platform defaults if not specified.
    pub fn effective_storage_path(&self) -> PathBuf {
        if let Some(ref path) = self.storage_path {
            path.clone()
        } else {
            default_storage_path()
        }
    }

    /// Returns the sweep interval, if background sweeping is enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if let Some(interval) = self.sweep_interval_secs {
            if interval == 0 {
                return Some("sweep interval must be > 0".to_string());
            }
        }

        if let Some(ref path) = self.storage_path {
            if path.as_os_str().is_empty() {
                return Some("storage path cannot be empty".to_string());
            }
        }

        None
    }
}

/// Returns the platform-specific default track storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/jukebox/tracks
/// - Linux: ~/.local/share/jukebox/tracks
/// - Windows: C:\Users\<user>\AppData\Roaming\jukebox\data\tracks
fn default_storage_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jukebox") {
        proj_dirs.data_dir().join("tracks")
    } else {
        // Fallback to current directory
        PathBuf::from("./tracks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_policy_parsing() {
        assert_eq!(ScorePolicy::parse("keep"), Some(ScorePolicy::Keep));
        assert_eq!(ScorePolicy::parse("RESET"), Some(ScorePolicy::Reset));
        assert_eq!(
            ScorePolicy::parse("reset-on-rotation"),
            Some(ScorePolicy::Reset)
        );
        assert_eq!(ScorePolicy::parse("sometimes"), None);
    }

    #[test]
    fn score_policy_display() {
        assert_eq!(ScorePolicy::Keep.to_string(), "keep");
        assert_eq!(ScorePolicy::Reset.to_string(), "reset");
        assert!(ScorePolicy::Reset.resets_scores());
        assert!(!ScorePolicy::Keep.resets_scores());
    }

    #[test]
    fn config_validation() {
        let mut config = JukeboxConfig::new();
        assert!(config.validate().is_none());

        config.sweep_interval_secs = Some(0);
        assert!(config.validate().is_some());

        config.sweep_interval_secs = Some(5);
        assert!(config.validate().is_none());
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn effective_storage_path() {
        let config = JukeboxConfig::new();
        assert!(!config.effective_storage_path().as_os_str().is_empty());

        let config = JukeboxConfig {
            storage_path: Some(PathBuf::from("/srv/jukebox")),
            ..Default::default()
        };
        assert_eq!(config.effective_storage_path(), PathBuf::from("/srv/jukebox"));
    }

    #[test]
    fn defaults() {
        let config = JukeboxConfig::default();
        assert_eq!(config.score_policy, ScorePolicy::Keep);
        assert!(config.seed.is_none());
        assert!(config.sweep_interval().is_none());
    }
}
