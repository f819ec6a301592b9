//! Per-operation request handlers.
//!
//! Each handler takes the session [`State`] and the raw `params` value and
//! returns either a result object or an [`OpError`] with a canonical code.
//! Dispatch runs on a single task, so handlers never observe concurrency.

mod close;
mod init;
mod open;
mod read;
mod stat;
mod temp;
mod write;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::proto::{ErrorCode, Request, Response};
use crate::server::state::State;

/// Ops reserved by the protocol whose semantics are not fixed yet. They must
/// answer `E_UNSUPPORTED` rather than guessing.
const RESERVED_OPS: &[&str] = &["make_pipe", "stream_read", "stream_write"];

/// Handler failure: a canonical code plus a human-readable message.
#[derive(Debug)]
pub struct OpError {
    pub code: ErrorCode,
    pub message: String,
}

impl OpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn arg(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Arg, message)
    }

    pub fn perm(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Perm, message)
    }

    pub fn closed() -> Self {
        Self::new(ErrorCode::Closed, "invalid handle")
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unsupported, message)
    }
}

impl From<std::io::Error> for OpError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::new(ErrorCode::NoEnt, "not found"),
            ErrorKind::PermissionDenied => Self::new(ErrorCode::Perm, "permission denied"),
            _ => Self::new(ErrorCode::Io, err.to_string()),
        }
    }
}

pub type OpResult = Result<Value, OpError>;

/// Deserialize `params` into the handler's argument struct.
fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, OpError> {
    let value = if params.is_null() { json!({}) } else { params.clone() };
    serde_json::from_value(value).map_err(|err| OpError::arg(err.to_string()))
}

/// Route one request to its handler and wrap the outcome in a [`Response`].
pub fn dispatch(state: &mut State, req: Request) -> Response {
    let Request { id, op, params } = req;
    debug!(%id, %op, "dispatch");

    let outcome = match op.as_str() {
        "ping" => Ok(json!({ "pong": true })),
        "init" => init::init(state, &params),
        "open" => open::open(state, &params),
        "read" => read::read(state, &params),
        "write" => write::write(state, &params),
        "close" => close::close(state, &params),
        "stat" => stat::stat(state, &params),
        "temp" => temp::temp(state, &params),
        reserved if RESERVED_OPS.contains(&reserved) => {
            Err(OpError::unsupported(format!("{reserved} is not implemented")))
        }
        unknown => Err(OpError::unsupported(unknown.to_owned())),
    };

    match outcome {
        Ok(result) => Response::success(id, result),
        Err(err) => {
            warn!(%id, %op, code = %err.code, message = %err.message, "request failed");
            Response::failure(id, err.code, err.message)
        }
    }
}
