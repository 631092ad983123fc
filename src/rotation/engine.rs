//! Rotation engine: decides which track a group plays next.
//!
//! Rotation is lazy. Nothing happens until a group is read; the read calls
//! [`RotationEngine::refresh`], which replaces an expired track exactly once.
//!
//! Catalog listing and duration probing touch the disk, so they never run
//! while a group lock is held. A refresh snapshots the group, releases the
//! lock, picks a track, then re-locks and commits only if the group revision
//! is unchanged.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::ScorePolicy;
use crate::error::JukeboxError;
use crate::store::TrackStore;
use crate::types::{lock_group, Group, Member, NowPlaying, TrackRef};

/// Commit attempts before a contended refresh gives up until the next read.
pub const MAX_ROTATION_ATTEMPTS: usize = 3;

/// A track chosen for playback, with its probed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub track: TrackRef,
    pub duration: Duration,
}

/// What a refresh did to the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No track yet, or the current track is still playing.
    Unchanged,
    /// The expired track was replaced.
    Rotated,
    /// The track expired but no member has a playable track.
    Stalled,
    /// Concurrent writers kept changing the group; retry on the next read.
    Contended,
}

/// Selects tracks for groups from member catalogs.
pub struct RotationEngine {
    store: Arc<dyn TrackStore>,
    policy: ScorePolicy,
    rng: Mutex<ChaCha8Rng>,
}

impl RotationEngine {
    /// Creates an engine over `store`.
    ///
    /// With a seed, track draws are reproducible; otherwise the RNG is
    /// seeded from OS entropy.
    pub fn new(store: Arc<dyn TrackStore>, policy: ScorePolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            store,
            policy,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &Arc<dyn TrackStore> {
        &self.store
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    /// Brings a group up to date and returns a snapshot of it.
    pub fn refresh(&self, group: &Mutex<Group>, now: SystemTime) -> Group {
        self.refresh_with_outcome(group, now).0
    }

    /// Like [`refresh`](Self::refresh), also reporting what happened.
    pub fn refresh_with_outcome(
        &self,
        group: &Mutex<Group>,
        now: SystemTime,
    ) -> (Group, RefreshOutcome) {
        for _ in 0..MAX_ROTATION_ATTEMPTS {
            let (members, revision) = {
                let guard = lock_group(group);
                if !is_rotation_due(&guard, now) {
                    return (guard.clone(), RefreshOutcome::Unchanged);
                }
                (guard.members.clone(), guard.revision())
            };

            let selection = self.select_next(&members, now);

            let mut guard = lock_group(group);
            if guard.revision() != revision {
                debug!(code = %guard.code, "Group changed during rotation, retrying");
                continue;
            }

            return match selection {
                Some(selection) => {
                    self.commit_rotation(&mut guard, selection, now);
                    (guard.clone(), RefreshOutcome::Rotated)
                }
                None => {
                    debug!(code = %guard.code, "Track expired but no member has playable tracks");
                    (guard.clone(), RefreshOutcome::Stalled)
                }
            };
        }

        let guard = lock_group(group);
        warn!(code = %guard.code, "Rotation contended, deferring to next read");
        (guard.clone(), RefreshOutcome::Contended)
    }

    /// Starts playback from `device_id`'s catalog if the group has no track yet.
    ///
    /// Returns true if a track was started. No-op when the device has no
    /// playable tracks or another join already started one.
    pub fn select_initial(&self, group: &Mutex<Group>, device_id: &str, now: SystemTime) -> bool {
        if lock_group(group).now_playing.is_some() {
            return false;
        }

        let Some(selection) = self.draw_from_device(device_id, now) else {
            return false;
        };

        let mut guard = lock_group(group);
        if guard.now_playing.is_some() {
            return false;
        }

        info!(
            code = %guard.code,
            track = %selection.track,
            duration_ms = selection.duration.as_millis() as u64,
            "Starting playback"
        );
        guard.set_now_playing(NowPlaying::start(selection.track, now, selection.duration));
        true
    }

    /// Picks the next track across all members.
    ///
    /// Members are tried from highest to lowest score, ties in join order.
    /// The first member with at least one playable track wins.
    pub fn select_next(&self, members: &[Member], now: SystemTime) -> Option<Selection> {
        rank_members(members)
            .into_iter()
            .find_map(|member| self.draw_from_device(&member.device_id, now))
    }

    /// Draws one playable track uniformly at random from a device's catalog.
    ///
    /// Tracks whose duration cannot be read, or whose end time starting at
    /// `now` is not representable, are skipped and the draw continues over
    /// the remaining ones.
    pub fn draw_from_device(&self, device_id: &str, now: SystemTime) -> Option<Selection> {
        let mut tracks = self.store.list_available(device_id);
        if tracks.is_empty() {
            return None;
        }

        tracks.shuffle(&mut *self.rng.lock().unwrap_or_else(|e| e.into_inner()));

        for track_id in tracks {
            let duration = self
                .store
                .duration(device_id, &track_id)
                .and_then(|duration| match now.checked_add(duration) {
                    Some(_) => Ok(duration),
                    None => Err(JukeboxError::media(device_id, &track_id, "duration out of range")),
                });
            match duration {
                Ok(duration) => {
                    return Some(Selection {
                        track: TrackRef::new(device_id, track_id),
                        duration,
                    })
                }
                Err(e) => {
                    warn!(device_id, track_id = %track_id, error = %e, "Skipping unreadable track");
                }
            }
        }

        None
    }

    fn commit_rotation(&self, group: &mut Group, selection: Selection, now: SystemTime) {
        info!(
            code = %group.code,
            track = %selection.track,
            duration_ms = selection.duration.as_millis() as u64,
            "Rotating to next track"
        );
        group.set_now_playing(NowPlaying::start(selection.track, now, selection.duration));

        if self.policy.resets_scores() {
            group.reset_scores();
        }
    }
}

/// Returns true if the group has a track whose end time has been reached.
pub fn is_rotation_due(group: &Group, now: SystemTime) -> bool {
    group
        .now_playing
        .as_ref()
        .is_some_and(|playing| playing.is_expired(now))
}

/// Orders members by descending score; equal scores keep join order.
pub fn rank_members(members: &[Member]) -> Vec<&Member> {
    let mut ranked: Vec<&Member> = members.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
