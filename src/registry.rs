//! Group registry: owns every live group.
//!
//! Each group sits behind its own mutex so different groups never contend.
//! The map itself is behind a read-write lock and is only written when a
//! group is created. Groups are never removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{JukeboxError, Result};
use crate::rotation::{RefreshOutcome, RotationEngine};
use crate::store::TrackStore;
use crate::types::{lock_group, Group, Member, TrackRef};

/// Length of generated group codes.
pub const CODE_LENGTH: usize = 4;

/// Characters used in group codes.
const CODE_ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

type GroupHandle = Arc<Mutex<Group>>;

#[derive(Default)]
struct Groups {
    by_code: HashMap<String, GroupHandle>,
    /// Codes in creation order.
    order: Vec<String>,
}

/// Tracks available to a group, as reported by `group_playlist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlaylist {
    pub code: String,
    /// Every track in members' catalogs, in member join order.
    pub available: Vec<TrackRef>,
    /// Members that have nothing uploaded.
    pub members_without_tracks: Vec<String>,
}

/// Registry of live groups plus the engine that rotates them.
pub struct GroupRegistry {
    groups: RwLock<Groups>,
    engine: RotationEngine,
    code_rng: Mutex<ChaCha8Rng>,
}

impl GroupRegistry {
    /// Creates a registry whose group codes are drawn from OS entropy.
    pub fn new(engine: RotationEngine) -> Self {
        Self::with_code_seed(engine, None)
    }

    /// Creates a registry; with a seed, the sequence of group codes is
    /// reproducible.
    pub fn with_code_seed(engine: RotationEngine, seed: Option<u64>) -> Self {
        let code_rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            groups: RwLock::new(Groups::default()),
            engine,
            code_rng: Mutex::new(code_rng),
        }
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    /// Creates an empty group under a fresh code.
    pub fn create_group(&self) -> Group {
        let mut rng = self.code_rng.lock().unwrap_or_else(|e| e.into_inner());
        self.create_group_with(&mut *rng)
    }

    /// Creates an empty group, drawing its code from `rng`.
    ///
    /// Colliding codes are regenerated until one is free.
    pub fn create_group_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Group {
        let mut groups = self.write();

        let mut code = generate_group_code(rng);
        while groups.by_code.contains_key(&code) {
            debug!(code = %code, "Group code collision, regenerating");
            code = generate_group_code(rng);
        }

        let group = Group::new(code.clone());
        groups
            .by_code
            .insert(code.clone(), Arc::new(Mutex::new(group.clone())));
        groups.order.push(code.clone());

        info!(code = %code, total = groups.order.len(), "Created group");
        group
    }

    /// Returns every group in creation order, refreshed as of `now`.
    pub fn list_groups(&self, now: SystemTime) -> Vec<Group> {
        self.handles()
            .into_iter()
            .map(|handle| self.engine.refresh(&handle, now))
            .collect()
    }

    /// Returns one group, refreshed as of `now`.
    pub fn get_group(&self, code: &str, now: SystemTime) -> Result<Group> {
        let handle = self.handle(code)?;
        Ok(self.engine.refresh(&handle, now))
    }

    /// Adds a device to a group, or renames it if already a member.
    ///
    /// If the group has no track yet, playback starts from the joining
    /// device's catalog.
    pub fn join_group(
        &self,
        code: &str,
        device_id: &str,
        display_name: &str,
        now: SystemTime,
    ) -> Result<Member> {
        let handle = self.handle(code)?;

        if device_id.trim().is_empty() {
            return Err(JukeboxError::missing_field("device_id"));
        }
        if display_name.trim().is_empty() {
            return Err(JukeboxError::missing_field("display_name"));
        }

        let (member, needs_track) = {
            let mut group = lock_group(&handle);
            let (member, added) = group.upsert_member(device_id, display_name);
            if added {
                info!(code = %group.code, device_id, display_name, "Member joined");
            }
            (member, group.now_playing.is_none())
        };

        if needs_track {
            self.engine.select_initial(&handle, device_id, now);
        }

        Ok(member)
    }

    /// Overwrites a member's score. Any integer is accepted.
    pub fn set_score(&self, code: &str, device_id: &str, score: i64) -> Result<Member> {
        let handle = self.handle(code)?;
        let mut group = lock_group(&handle);
        group
            .set_score(device_id, score)
            .ok_or_else(|| JukeboxError::member_not_found(&group.code, device_id))
    }

    /// Lists the tracks the group's members could play.
    pub fn group_playlist(&self, code: &str) -> Result<GroupPlaylist> {
        let handle = self.handle(code)?;
        let (code, device_ids): (String, Vec<String>) = {
            let group = lock_group(&handle);
            (
                group.code.clone(),
                group.members.iter().map(|m| m.device_id.clone()).collect(),
            )
        };

        let store = self.engine.store();
        let mut available = Vec::new();
        let mut members_without_tracks = Vec::new();
        for device_id in device_ids {
            let tracks = store.list_available(&device_id);
            if tracks.is_empty() {
                members_without_tracks.push(device_id);
            } else {
                available.extend(
                    tracks
                        .into_iter()
                        .map(|track| TrackRef::new(device_id.clone(), track)),
                );
            }
        }

        Ok(GroupPlaylist {
            code,
            available,
            members_without_tracks,
        })
    }

    /// Refreshes every group. Returns how many rotated.
    pub fn refresh_all(&self, now: SystemTime) -> usize {
        self.handles()
            .into_iter()
            .filter(|handle| {
                let (_, outcome) = self.engine.refresh_with_outcome(handle, now);
                outcome == RefreshOutcome::Rotated
            })
            .count()
    }

    /// Number of live groups.
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn handle(&self, code: &str) -> Result<GroupHandle> {
        let code = normalize_code(code);
        self.read()
            .by_code
            .get(&code)
            .cloned()
            .ok_or_else(|| JukeboxError::group_not_found(&code))
    }

    /// Snapshot of all handles so no registry lock is held during refresh.
    fn handles(&self) -> Vec<GroupHandle> {
        let groups = self.read();
        groups
            .order
            .iter()
            .filter_map(|code| groups.by_code.get(code).cloned())
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Groups> {
        self.groups.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Groups> {
        self.groups.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Generates a random group code of [`CODE_LENGTH`] uppercase letters.
pub fn generate_group_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively and ignore surrounding whitespace.
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScorePolicy;
    use crate::error::ErrorCode;
    use crate::store::memory::MemoryTrackStore;
    use std::collections::HashSet;
    use std::time::{Duration, UNIX_EPOCH};

    fn t(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn registry_with(store: Arc<MemoryTrackStore>) -> GroupRegistry {
        GroupRegistry::new(RotationEngine::new(store, ScorePolicy::Keep, Some(1)))
    }

    fn empty_registry() -> GroupRegistry {
        registry_with(Arc::new(MemoryTrackStore::new()))
    }

    #[test]
    fn generated_codes_are_four_uppercase_letters() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let code = generate_group_code(&mut rng);
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn created_groups_have_unique_codes() {
        let registry = empty_registry();
        let codes: HashSet<_> = (0..500).map(|_| registry.create_group().code).collect();
        assert_eq!(codes.len(), 500);
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn colliding_code_is_regenerated() {
        let registry = empty_registry();
        let mut expected = ChaCha8Rng::seed_from_u64(21);
        let first_code = generate_group_code(&mut expected);
        let second_code = generate_group_code(&mut expected);
        assert_ne!(first_code, second_code);

        // Same seed twice: the second creation draws the taken code first.
        let first = registry.create_group_with(&mut ChaCha8Rng::seed_from_u64(21));
        let second = registry.create_group_with(&mut ChaCha8Rng::seed_from_u64(21));

        assert_eq!(first.code, first_code);
        assert_eq!(second.code, second_code);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn seeded_registries_issue_same_codes() {
        let store = Arc::new(MemoryTrackStore::new());
        let engine = || RotationEngine::new(store.clone(), ScorePolicy::Keep, None);
        let left = GroupRegistry::with_code_seed(engine(), Some(8));
        let right = GroupRegistry::with_code_seed(engine(), Some(8));

        for _ in 0..5 {
            assert_eq!(left.create_group().code, right.create_group().code);
        }
    }

    #[test]
    fn new_group_is_empty() {
        let registry = empty_registry();
        let group = registry.create_group();
        assert!(group.members.is_empty());
        assert!(group.now_playing.is_none());
    }

    #[test]
    fn list_groups_in_creation_order() {
        let registry = empty_registry();
        let first = registry.create_group().code;
        let second = registry.create_group().code;

        let listed: Vec<_> = registry.list_groups(t(0)).into_iter().map(|g| g.code).collect();
        assert_eq!(listed, vec![first, second]);
    }

    #[test]
    fn get_unknown_group_is_not_found() {
        let registry = empty_registry();
        let err = registry.get_group("ZZZZ", t(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn get_group_ignores_case() {
        let registry = empty_registry();
        let code = registry.create_group().code;
        let group = registry.get_group(&code.to_lowercase(), t(0)).unwrap();
        assert_eq!(group.code, code);
    }

    #[test]
    fn join_validates_input() {
        let registry = empty_registry();
        let code = registry.create_group().code;

        let err = registry.join_group(&code, "", "Alice", t(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = registry.join_group(&code, "a", "  ", t(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = registry.join_group("NOPE", "a", "Alice", t(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn rejoin_is_idempotent() {
        let registry = empty_registry();
        let code = registry.create_group().code;

        registry.join_group(&code, "a", "Alice", t(0)).unwrap();
        registry.set_score(&code, "a", 12).unwrap();
        let member = registry.join_group(&code, "a", "Alicia", t(0)).unwrap();

        assert_eq!(member.display_name, "Alicia");
        assert_eq!(member.score, 12);
        let group = registry.get_group(&code, t(0)).unwrap();
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].display_name, "Alicia");
    }

    #[test]
    fn set_score_targets_one_member() {
        let registry = empty_registry();
        let code = registry.create_group().code;
        registry.join_group(&code, "a", "Alice", t(0)).unwrap();
        registry.join_group(&code, "b", "Bob", t(0)).unwrap();

        let member = registry.set_score(&code, "b", -4).unwrap();
        assert_eq!(member.score, -4);

        let group = registry.get_group(&code, t(0)).unwrap();
        assert_eq!(group.member("a").unwrap().score, 0);
        assert_eq!(group.member("b").unwrap().score, -4);
    }

    #[test]
    fn set_score_unknown_member_or_group() {
        let registry = empty_registry();
        let code = registry.create_group().code;

        let err = registry.set_score(&code, "ghost", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.message.contains("ghost"));

        let err = registry.set_score("NOPE", "a", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn second_joiner_with_tracks_starts_playback() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("b", "b1.wav", 30);
        store.insert("b", "b2.wav", 45);
        let registry = registry_with(store);
        let code = registry.create_group().code;

        registry.join_group(&code, "a", "Alice", t(100)).unwrap();
        assert!(registry.get_group(&code, t(100)).unwrap().now_playing.is_none());

        registry.join_group(&code, "b", "Bob", t(100)).unwrap();
        let playing = registry
            .get_group(&code, t(101))
            .unwrap()
            .now_playing
            .unwrap();

        assert_eq!(playing.track.device_id, "b");
        let expected_end = match playing.track.filename.as_str() {
            "b1.wav" => t(130),
            "b2.wav" => t(145),
            other => panic!("unexpected track {}", other),
        };
        assert_eq!(playing.ends_at, expected_end);
    }

    #[test]
    fn expired_track_rotates_on_read() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("a", "only.wav", 60);
        let registry = registry_with(store);
        let code = registry.create_group().code;
        registry.join_group(&code, "a", "Alice", t(0)).unwrap();

        let first = registry.get_group(&code, t(10)).unwrap().now_playing.unwrap();
        assert_eq!(first.ends_at, t(60));

        let rotated = registry.get_group(&code, t(75)).unwrap().now_playing.unwrap();
        assert_eq!(rotated.track, TrackRef::new("a", "only.wav"));
        assert_eq!(rotated.started_at, t(75));
        assert_eq!(rotated.ends_at, t(135));
    }

    #[test]
    fn rotation_prefers_highest_score() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("a", "a.wav", 10);
        store.insert("b", "b.wav", 10);
        let registry = registry_with(store);
        let code = registry.create_group().code;
        registry.join_group(&code, "a", "Alice", t(0)).unwrap();
        registry.join_group(&code, "b", "Bob", t(0)).unwrap();
        registry.set_score(&code, "b", 3).unwrap();

        let playing = registry.get_group(&code, t(10)).unwrap().now_playing.unwrap();
        assert_eq!(playing.track, TrackRef::new("b", "b.wav"));
    }

    #[test]
    fn playlist_reports_members_without_tracks() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("b", "b1.wav", 10);
        store.insert("b", "b2.wav", 10);
        let registry = registry_with(store);
        let code = registry.create_group().code;
        registry.join_group(&code, "a", "Alice", t(0)).unwrap();
        registry.join_group(&code, "b", "Bob", t(0)).unwrap();

        let playlist = registry.group_playlist(&code).unwrap();
        assert_eq!(
            playlist.available,
            vec![TrackRef::new("b", "b1.wav"), TrackRef::new("b", "b2.wav")]
        );
        assert_eq!(playlist.members_without_tracks, vec!["a".to_string()]);
    }

    #[test]
    fn refresh_all_counts_rotations() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("a", "a.wav", 10);
        let registry = registry_with(store);

        let playing = registry.create_group().code;
        registry.join_group(&playing, "a", "Alice", t(0)).unwrap();
        registry.create_group();

        assert_eq!(registry.refresh_all(t(5)), 0);
        assert_eq!(registry.refresh_all(t(10)), 1);
    }
}
