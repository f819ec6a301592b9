//! The `stat` operation: size, mtime and kind of an open handle's backing.

use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize)]
struct StatParams {
    h: u64,
}

pub(super) fn stat(state: &mut State, params: &Value) -> OpResult {
    let args: StatParams = parse_params(params)?;
    let handle = state.handle(args.h).ok_or_else(OpError::closed)?;

    let meta = handle.backing.metadata()?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Ok(json!({
        "size": meta.len(),
        "mtime": mtime,
        "kind": handle.kind.as_str(),
    }))
}
