//! Wire protocol shared by the VFS server and client.
//!
//! Every message is a 4-byte big-endian length followed by a UTF-8 JSON
//! payload. Binary file contents travel base64-encoded inside the JSON so
//! the channel stays text-safe.

pub mod frame;


use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};

/// Canonical error codes carried in [`Response`] envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed request parameters.
    #[serde(rename = "E_ARG")]
    Arg,
    /// Unknown operation or directory semantics.
    #[serde(rename = "E_UNSUPPORTED")]
    Unsupported,
    /// Path not found.
    #[serde(rename = "E_NOENT")]
    NoEnt,
    /// Allowlist or mode violation.
    #[serde(rename = "E_PERM")]
    Perm,
    /// Underlying OS error.
    #[serde(rename = "E_IO")]
    Io,
    /// Handle invalid or already closed.
    #[serde(rename = "E_CLOSED")]
    Closed,
}

impl ErrorCode {
    /// The wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Arg => "E_ARG",
            ErrorCode::Unsupported => "E_UNSUPPORTED",
            ErrorCode::NoEnt => "E_NOENT",
            ErrorCode::Perm => "E_PERM",
            ErrorCode::Io => "E_IO",
            ErrorCode::Closed => "E_CLOSED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request envelope. The `id` is echoed unmodified in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub op: String,
    #[serde(default)]
    pub params: Value,
}

/// Error payload of a failed [`Response`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Response envelope. Exactly one response per request, in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Build a success response.
    pub fn success(id: String, result: Value) -> Self {
        Self { id, ok: true, result: Some(result), error: None }
    }

    /// Build an error response with a canonical code.
    pub fn failure(id: String, code: ErrorCode, message: impl Into<String>) -> Self {
        Self { id, ok: false, result: None, error: Some(ErrorBody { code, message: message.into() }) }
    }
}

/// Encode file bytes for transport.
pub fn encode_data(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode transported file bytes. `None` on invalid base64.
pub fn decode_data(data: &str) -> Option<Vec<u8>> {
    BASE64.decode(data).ok()
}
