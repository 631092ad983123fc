//! JSON-RPC method handlers.
//!
//! Implements the handlers for all supported JSON-RPC methods. Every handler
//! receives the `now` read once for the request.

use std::path::Path;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::JukeboxError;
use crate::store::TrackStore;

use super::server::ServerState;
use super::types::{
    DeviceParams, GroupCodeParams, JoinGroupParams, JsonRpcError, ListTracksResult,
    SetScoreParams, SweepResult, UploadTrackParams,
};

/// Handles a JSON-RPC method call.
pub fn handle_request(
    method: &str,
    params: serde_json::Value,
    state: &mut ServerState,
    now: SystemTime,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "create_group" => handle_create_group(state),
        "list_groups" => to_value(state.registry.list_groups(now)),
        "get_group" => handle_get_group(params, state, now),
        "join_group" => handle_join_group(params, state, now),
        "set_score" => handle_set_score(params, state),
        "group_playlist" => handle_group_playlist(params, state),
        "upload_track" => handle_upload_track(params, state),
        "list_tracks" => handle_list_tracks(params, state),
        "list_all_tracks" => to_value(state.registry.engine().store().list_all()),
        "sweep" => handle_sweep(state, now),
        "ping" => handle_ping(),
        "shutdown" => handle_shutdown(state),
        _ => Err(JsonRpcError::method_not_found(method)),
    }
}

/// Handles the ping method for health checks.
fn handle_ping() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "status": "ok" }))
}

/// Handles the shutdown method.
fn handle_shutdown(state: &mut ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.shutdown();
    Ok(serde_json::json!({ "status": "shutting_down" }))
}

fn handle_create_group(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    to_value(state.registry.create_group())
}

fn handle_get_group(
    params: serde_json::Value,
    state: &ServerState,
    now: SystemTime,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GroupCodeParams = parse_params(params)?;
    to_value(state.registry.get_group(&params.code, now)?)
}

fn handle_join_group(
    params: serde_json::Value,
    state: &ServerState,
    now: SystemTime,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: JoinGroupParams = parse_params(params)?;
    let member = state
        .registry
        .join_group(&params.code, &params.device_id, &params.display_name, now)?;
    to_value(member)
}

fn handle_set_score(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: SetScoreParams = parse_params(params)?;
    let member = state
        .registry
        .set_score(&params.code, &params.device_id, params.score)?;
    to_value(member)
}

fn handle_group_playlist(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GroupCodeParams = parse_params(params)?;
    to_value(state.registry.group_playlist(&params.code)?)
}

/// Copies a local audio file into a device catalog.
fn handle_upload_track(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: UploadTrackParams = parse_params(params)?;
    if params.device_id.trim().is_empty() {
        return Err(JukeboxError::missing_field("device_id").into());
    }

    let source = Path::new(&params.source_path);
    let filename = match params.filename {
        Some(name) => name,
        None => source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| JukeboxError::missing_field("filename"))?,
    };

    let bytes = std::fs::read(source).map_err(|e| {
        JukeboxError::storage(format!("Failed to read {}", source.display()), e)
    })?;

    let entry = state
        .registry
        .engine()
        .store()
        .add_track(&params.device_id, &filename, &bytes)?;

    info!(
        device_id = %entry.device_id,
        filename = %entry.filename,
        duration_ms = entry.duration.as_millis() as u64,
        "Track uploaded"
    );
    to_value(entry)
}

fn handle_list_tracks(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: DeviceParams = parse_params(params)?;
    if params.device_id.trim().is_empty() {
        return Err(JukeboxError::missing_field("device_id").into());
    }

    let tracks = state.registry.engine().store().list_available(&params.device_id);
    to_value(ListTracksResult {
        device_id: params.device_id,
        tracks,
    })
}

fn handle_sweep(state: &ServerState, now: SystemTime) -> Result<serde_json::Value, JsonRpcError> {
    let rotated = state.registry.refresh_all(now);
    to_value(SweepResult {
        groups: state.registry.len(),
        rotated,
    })
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::JukeboxConfig;
    use crate::store::memory::MemoryTrackStore;
    use crate::store::DiskTrackStore;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    fn t(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn memory_state(store: Arc<MemoryTrackStore>) -> ServerState {
        ServerState::with_store(
            JukeboxConfig {
                seed: Some(11),
                ..Default::default()
            },
            store,
            Arc::new(FixedClock::new(t(0))),
        )
    }

    fn create(state: &mut ServerState) -> String {
        let group = handle_request("create_group", serde_json::Value::Null, state, t(0)).unwrap();
        group["code"].as_str().unwrap().to_string()
    }

    #[test]
    fn handle_ping() {
        let value = super::handle_ping().unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[test]
    fn handle_shutdown() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        super::handle_shutdown(&mut state).unwrap();
        assert!(state.is_shutdown());
    }

    #[test]
    fn handle_unknown_method() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        let err = handle_request("nonexistent", serde_json::Value::Null, &mut state, t(0))
            .unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn get_group_requires_code() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        let err = handle_request("get_group", serde_json::json!({}), &mut state, t(0)).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn join_without_device_is_invalid_input() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        let code = create(&mut state);

        let err = handle_request(
            "join_group",
            serde_json::json!({ "code": code, "display_name": "Alice" }),
            &mut state,
            t(0),
        )
        .unwrap_err();
        assert_eq!(err.code, -32011);
    }

    #[test]
    fn set_score_for_stranger_is_not_found() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        let code = create(&mut state);

        let err = handle_request(
            "set_score",
            serde_json::json!({ "code": code, "device_id": "ghost", "score": 3 }),
            &mut state,
            t(0),
        )
        .unwrap_err();
        assert_eq!(err.code, -32010);
    }

    #[test]
    fn list_groups_returns_all() {
        let mut state = memory_state(Arc::new(MemoryTrackStore::new()));
        create(&mut state);
        create(&mut state);

        let groups =
            handle_request("list_groups", serde_json::Value::Null, &mut state, t(0)).unwrap();
        assert_eq!(groups.as_array().unwrap().len(), 2);
    }

    #[test]
    fn sweep_reports_rotations() {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("a", "a.wav", 10);
        let mut state = memory_state(store);
        let code = create(&mut state);
        handle_request(
            "join_group",
            serde_json::json!({ "code": code, "device_id": "a", "display_name": "Alice" }),
            &mut state,
            t(0),
        )
        .unwrap();

        let result = handle_request("sweep", serde_json::Value::Null, &mut state, t(20)).unwrap();
        assert_eq!(result["groups"], 1);
        assert_eq!(result["rotated"], 1);
    }

    #[test]
    fn upload_then_list_tracks_on_disk() {
        let storage = tempdir().unwrap();
        let sources = tempdir().unwrap();
        let source = sources.path().join("beat.wav");
        crate::store::probe::tests::write_silent_wav(&source, 2.0, 8000);

        let store = Arc::new(DiskTrackStore::open(storage.path()).unwrap());
        let mut state = ServerState::with_store(
            JukeboxConfig::default(),
            store,
            Arc::new(FixedClock::new(t(0))),
        );

        let entry = handle_request(
            "upload_track",
            serde_json::json!({ "device_id": "phone", "source_path": source }),
            &mut state,
            t(0),
        )
        .unwrap();
        assert_eq!(entry["filename"], "beat.wav");
        assert_eq!(entry["duration_ms"], 2_000);

        let listed = handle_request(
            "list_tracks",
            serde_json::json!({ "device_id": "phone" }),
            &mut state,
            t(0),
        )
        .unwrap();
        assert_eq!(listed["tracks"], serde_json::json!(["beat.wav"]));

        let all =
            handle_request("list_all_tracks", serde_json::Value::Null, &mut state, t(0)).unwrap();
        assert_eq!(all[0]["device_id"], "phone");
    }

    #[test]
    fn upload_missing_source_is_storage_failure() {
        let storage = tempdir().unwrap();
        let store = Arc::new(DiskTrackStore::open(storage.path()).unwrap());
        let mut state = ServerState::with_store(
            JukeboxConfig::default(),
            store,
            Arc::new(FixedClock::new(t(0))),
        );

        let err = handle_request(
            "upload_track",
            serde_json::json!({ "device_id": "phone", "source_path": "/nonexistent/x.wav" }),
            &mut state,
            t(0),
        )
        .unwrap_err();
        assert_eq!(err.code, -32014);
    }

    #[test]
    fn upload_corrupt_audio_is_media_error() {
        let storage = tempdir().unwrap();
        let sources = tempdir().unwrap();
        let source = sources.path().join("noise.mp3");
        std::fs::write(&source, b"not audio at all").unwrap();

        let store = Arc::new(DiskTrackStore::open(storage.path()).unwrap());
        let mut state = ServerState::with_store(
            JukeboxConfig::default(),
            store,
            Arc::new(FixedClock::new(t(0))),
        );

        let err = handle_request(
            "upload_track",
            serde_json::json!({ "device_id": "phone", "source_path": source }),
            &mut state,
            t(0),
        )
        .unwrap_err();
        assert_eq!(err.code, -32012);
    }
}
