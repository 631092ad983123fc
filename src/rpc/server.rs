//! JSON-RPC server over stdin/stdout.
//!
//! Implements the JSON-RPC 2.0 protocol for daemon communication. Requests
//! and responses are one JSON document per line; logs go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::JukeboxConfig;
use crate::error::Result;
use crate::registry::GroupRegistry;
use crate::rotation::RotationEngine;
use crate::store::{DiskTrackStore, TrackStore};

use super::methods::handle_request;
use super::types::{JsonRpcError, JsonRpcErrorResponse, JsonRpcResponse, JsonRpcRequest};

/// State shared across all request handlers.
pub struct ServerState {
    /// Live groups and the rotation engine.
    pub registry: Arc<GroupRegistry>,
    /// Time source, read once per request.
    pub clock: Arc<dyn Clock>,
    /// Daemon configuration.
    pub config: JukeboxConfig,
    /// Flag to signal server shutdown.
    shutdown: Arc<AtomicBool>,
}

impl ServerState {
    /// Creates server state backed by the on-disk track store.
    pub fn new(config: JukeboxConfig) -> Result<Self> {
        let store = DiskTrackStore::open(config.effective_storage_path())?;
        info!(path = %store.root().display(), "Track storage ready");
        Ok(Self::with_store(config, Arc::new(store), Arc::new(SystemClock)))
    }

    /// Creates server state from explicit collaborators.
    pub fn with_store(
        config: JukeboxConfig,
        store: Arc<dyn TrackStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = RotationEngine::new(store, config.score_policy, config.seed);
        Self {
            registry: Arc::new(GroupRegistry::with_code_seed(engine, config.seed)),
            clock,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns true if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Runs the JSON-RPC server, reading from stdin and writing to stdout.
pub fn run_server(mut state: ServerState) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = stdin.lock();

    info!("JSON-RPC server started, waiting for requests");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "Error reading stdin");
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = process_request(&line, &mut state);

        if let Some(response) = response {
            writeln!(stdout, "{}", response).ok();
            stdout.flush().ok();
        }

        if state.is_shutdown() {
            info!("Server shutdown requested");
            break;
        }
    }

    info!("JSON-RPC server stopped");
    Ok(())
}

/// Processes a single JSON-RPC request line.
fn process_request(line: &str, state: &mut ServerState) -> Option<String> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let error = JsonRpcErrorResponse::new(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            );
            return Some(serde_json::to_string(&error).unwrap_or_default());
        }
    };

    if request.jsonrpc != "2.0" {
        let error = JsonRpcErrorResponse::new(
            Some(request.id),
            JsonRpcError::invalid_request("Invalid JSON-RPC version (expected 2.0)"),
        );
        return Some(serde_json::to_string(&error).unwrap_or_default());
    }

    debug!(method = %request.method, "Handling request");
    let now = state.clock.now();
    let result = handle_request(&request.method, request.params, state, now);

    match result {
        Ok(response) => Some(
            serde_json::to_string(&JsonRpcResponse::new(request.id, response))
                .unwrap_or_default(),
        ),
        Err(error) => {
            debug!(
                method = %request.method,
                code = error.code,
                message = %error.message,
                "Request failed"
            );
            Some(
                serde_json::to_string(&JsonRpcErrorResponse::new(Some(request.id), error))
                    .unwrap_or_default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::memory::MemoryTrackStore;
    use std::time::{Duration, UNIX_EPOCH};

    fn test_state() -> ServerState {
        let store = Arc::new(MemoryTrackStore::new());
        store.insert("b", "b1.wav", 30);
        ServerState::with_store(
            JukeboxConfig {
                seed: Some(1),
                ..Default::default()
            },
            store,
            Arc::new(FixedClock::new(UNIX_EPOCH + Duration::from_secs(1_000))),
        )
    }

    fn call(state: &mut ServerState, body: &str) -> serde_json::Value {
        let response = process_request(body, state).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn server_state_shutdown() {
        let state = test_state();
        assert!(!state.is_shutdown());
        state.shutdown();
        assert!(state.is_shutdown());
    }

    #[test]
    fn process_invalid_json() {
        let mut state = test_state();
        let response = process_request("not json", &mut state).unwrap();
        assert!(response.contains("-32700")); // Parse error
    }

    #[test]
    fn process_invalid_version() {
        let mut state = test_state();
        let request = r#"{"jsonrpc":"1.0","method":"ping","id":1}"#;
        let response = process_request(request, &mut state).unwrap();
        assert!(response.contains("-32600")); // Invalid request
    }

    #[test]
    fn process_unknown_method() {
        let mut state = test_state();
        let request = r#"{"jsonrpc":"2.0","method":"unknown","id":1}"#;
        let response = process_request(request, &mut state).unwrap();
        assert!(response.contains("-32601")); // Method not found
    }

    #[test]
    fn group_session_over_rpc() {
        let mut state = test_state();

        let created = call(&mut state, r#"{"jsonrpc":"2.0","method":"create_group","id":1}"#);
        assert_eq!(created["id"], 1);
        let code = created["result"]["code"].as_str().unwrap().to_string();

        let join_a = format!(
            r#"{{"jsonrpc":"2.0","method":"join_group","id":2,"params":{{"code":"{}","device_id":"a","display_name":"Alice"}}}}"#,
            code
        );
        let joined = call(&mut state, &join_a);
        assert_eq!(joined["result"]["score"], 0);

        let join_b = format!(
            r#"{{"jsonrpc":"2.0","method":"join_group","id":3,"params":{{"code":"{}","device_id":"b","display_name":"Bob"}}}}"#,
            code
        );
        call(&mut state, &join_b);

        let get = format!(
            r#"{{"jsonrpc":"2.0","method":"get_group","id":"g","params":{{"code":"{}"}}}}"#,
            code
        );
        let group = call(&mut state, &get);
        assert_eq!(group["id"], "g");
        let playing = &group["result"]["now_playing"];
        assert_eq!(playing["device_id"], "b");
        assert_eq!(playing["filename"], "b1.wav");
        assert_eq!(playing["ends_at_ms"], 1_030_000);
    }

    #[test]
    fn unknown_group_maps_to_not_found() {
        let mut state = test_state();
        let response = call(
            &mut state,
            r#"{"jsonrpc":"2.0","method":"get_group","id":1,"params":{"code":"ZZZZ"}}"#,
        );
        assert_eq!(response["error"]["code"], -32010);
        assert_eq!(response["error"]["data"]["error_code"], "NOT_FOUND");
    }
}
