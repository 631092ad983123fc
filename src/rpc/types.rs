//! JSON-RPC types for the daemon protocol.
//!
//! Framing types follow JSON-RPC 2.0. Domain errors map onto the
//! application range starting at -32010.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, JukeboxError};

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Integer(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// A JSON-RPC request wrapper.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub id: RequestId,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC response wrapper.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: T,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(id: RequestId, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonRpcErrorData>,
}

/// Extended error data for application-specific errors.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorData {
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JsonRpcError {
    /// Creates a parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a method not found error (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }

    /// Creates an invalid params error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an internal error (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }

    /// Returns the application error code for a domain error.
    pub fn code_for(code: ErrorCode) -> i32 {
        match code {
            ErrorCode::NotFound => -32010,
            ErrorCode::InvalidInput => -32011,
            ErrorCode::MediaError => -32012,
            ErrorCode::Conflict => -32013,
            ErrorCode::StorageFailed => -32014,
        }
    }
}

impl From<JukeboxError> for JsonRpcError {
    fn from(err: JukeboxError) -> Self {
        Self {
            code: Self::code_for(err.code),
            message: err.code.description().to_string(),
            data: Some(JsonRpcErrorData {
                error_code: err.code.as_str().to_string(),
                details: Some(err.message),
            }),
        }
    }
}

// ============================================================================
// Method parameters
// ============================================================================

/// Parameters naming a single group.
#[derive(Debug, Deserialize)]
pub struct GroupCodeParams {
    pub code: String,
}

/// Parameters for `join_group`.
///
/// Missing fields deserialize as empty strings and are rejected by the
/// registry as INVALID_INPUT.
#[derive(Debug, Deserialize)]
pub struct JoinGroupParams {
    pub code: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub display_name: String,
}

/// Parameters for `set_score`.
#[derive(Debug, Deserialize)]
pub struct SetScoreParams {
    pub code: String,
    #[serde(default)]
    pub device_id: String,
    pub score: i64,
}

/// Parameters for `upload_track`.
#[derive(Debug, Deserialize)]
pub struct UploadTrackParams {
    #[serde(default)]
    pub device_id: String,
    /// Name to store the track under. Defaults to the source file name.
    pub filename: Option<String>,
    /// Local file to copy into the device catalog.
    pub source_path: String,
}

/// Parameters for `list_tracks`.
#[derive(Debug, Deserialize)]
pub struct DeviceParams {
    #[serde(default)]
    pub device_id: String,
}

// ============================================================================
// Method results
// ============================================================================

/// Result of `list_tracks`.
#[derive(Debug, Serialize)]
pub struct ListTracksResult {
    pub device_id: String,
    pub tracks: Vec<String>,
}

/// Result of `sweep`.
#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub groups: usize,
    pub rotated: usize,
}
