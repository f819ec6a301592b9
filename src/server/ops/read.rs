//! The `read` operation. Returns at most `min(max, chunk_cap)` bytes;
//! chunking across calls is the caller's responsibility.

use std::os::unix::fs::FileExt;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::proto::encode_data;
use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize)]
struct ReadParams {
    h: u64,
    max: Option<u64>,
}

pub(super) fn read(state: &mut State, params: &Value) -> OpResult {
    let args: ReadParams = parse_params(params)?;
    let cap = state.chunk_cap();
    let max = match args.max {
        Some(0) => return Err(OpError::arg("max must be > 0")),
        // the server clamps silently; no E_RANGE
        Some(m) => (m as usize).min(cap),
        None => cap,
    };

    let handle = state.handle_mut(args.h).ok_or_else(OpError::closed)?;
    if !handle.readable {
        return Err(OpError::perm("not readable"));
    }

    let mut buf = vec![0u8; max];
    let n = handle.backing.read_at(&mut buf, handle.offset)?;
    handle.offset += n as u64;
    buf.truncate(n);

    // eof is reported only by the empty read past the end
    Ok(json!({ "eof": n == 0, "data": encode_data(&buf) }))
}
