//! The `write` operation. Short writes are possible; callers loop.

use std::os::unix::fs::FileExt;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::proto::decode_data;
use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize)]
struct WriteParams {
    h: u64,
    data: String,
}

pub(super) fn write(state: &mut State, params: &Value) -> OpResult {
    let args: WriteParams = parse_params(params)?;
    let payload = decode_data(&args.data).ok_or_else(|| OpError::arg("bad base64"))?;

    let handle = state.handle_mut(args.h).ok_or_else(OpError::closed)?;
    if !handle.writable {
        return Err(OpError::perm("not writable"));
    }

    let n = if handle.append {
        // append writes always land at the current end, whatever the cursors
        let end = handle.backing.metadata()?.len();
        let n = handle.backing.write_at(&payload, end)?;
        handle.write_pos = end + n as u64;
        handle.offset = handle.write_pos;
        n
    } else {
        let n = handle.backing.write_at(&payload, handle.write_pos)?;
        handle.write_pos += n as u64;
        n
    };

    Ok(json!({ "written": n }))
}
