//! The `close` operation. Closing twice is an error; ids are never reissued.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize)]
struct CloseParams {
    h: u64,
}

pub(super) fn close(state: &mut State, params: &Value) -> OpResult {
    let args: CloseParams = parse_params(params)?;
    match state.release(args.h) {
        Some(_) => Ok(json!({ "closed": true })),
        None => Err(OpError::closed()),
    }
}
