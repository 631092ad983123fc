//! Group and Member types.
//!
//! A Group is a playback session identified by a short code. Members are kept
//! in join order; that order is the tie-breaker for rotation.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::track::NowPlaying;

/// A device participating in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Device identifier, unique within the group.
    pub device_id: String,
    /// Display name; updated when the device rejoins.
    pub display_name: String,
    /// Rotation priority. Higher scores are played first.
    pub score: i64,
}

impl Member {
    /// Creates a member with the default score of 0.
    pub fn new(device_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            display_name: display_name.into(),
            score: 0,
        }
    }
}

/// A playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique 4-letter code.
    pub code: String,

    /// Members in join order.
    pub members: Vec<Member>,

    /// Current track, if one has ever been selected.
    /// Stays in place after expiry until a replacement is found.
    pub now_playing: Option<NowPlaying>,

    /// Bumped on every mutation. Lets rotation detect changes made while
    /// the group lock was released for catalog work.
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl Group {
    /// Creates an empty group with no members and no current track.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            members: Vec::new(),
            now_playing: None,
            revision: 0,
        }
    }

    /// Returns the member with the given device id.
    pub fn member(&self, device_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.device_id == device_id)
    }

    /// Adds a member, or renames an existing one.
    ///
    /// Returns the resulting member and true if it was newly added. Rejoining
    /// never resets the score.
    pub fn upsert_member(&mut self, device_id: &str, display_name: &str) -> (Member, bool) {
        self.revision += 1;

        if let Some(member) = self.members.iter_mut().find(|m| m.device_id == device_id) {
            member.display_name = display_name.to_string();
            return (member.clone(), false);
        }

        let member = Member::new(device_id, display_name);
        self.members.push(member.clone());
        (member, true)
    }

    /// Overwrites one member's score.
    ///
    /// Returns None if the device is not a member.
    pub fn set_score(&mut self, device_id: &str, score: i64) -> Option<Member> {
        let member = self.members.iter_mut().find(|m| m.device_id == device_id)?;
        member.score = score;
        let updated = member.clone();
        self.revision += 1;
        Some(updated)
    }

    /// Sets every member's score to 0.
    pub fn reset_scores(&mut self) {
        for member in &mut self.members {
            member.score = 0;
        }
        self.revision += 1;
    }

    /// Replaces the current track.
    pub fn set_now_playing(&mut self, now_playing: NowPlaying) {
        self.now_playing = Some(now_playing);
        self.revision += 1;
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }
}

/// Locks a shared group, recovering the data if a holder panicked.
pub(crate) fn lock_group(group: &Mutex<Group>) -> MutexGuard<'_, Group> {
    group.lock().unwrap_or_else(|e| e.into_inner())
}
