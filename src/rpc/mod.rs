//! JSON-RPC module for daemon communication.
//!
//! Provides the JSON-RPC 2.0 server implementation for:
//! - `create_group`, `list_groups`, `get_group`: Group lifecycle and reads
//! - `join_group`, `set_score`: Membership and rotation priority
//! - `group_playlist`: Tracks available to a group
//! - `upload_track`, `list_tracks`, `list_all_tracks`: Track catalogs
//! - `sweep`: Refresh every group now
//! - `ping`: Health check
//! - `shutdown`: Graceful shutdown

pub mod methods;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use server::{run_server, ServerState};
pub use types::{
    JsonRpcError, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse, RequestId,
};
