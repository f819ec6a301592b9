//! The `temp` operation: allocate an anonymous rw temp handle.
//!
//! The backing has no path the caller can observe; the logical tag is
//! `<tmp-{handle}>`, derived from the server-assigned id. The kernel
//! reclaims the backing when the last handle on it closes.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::handle::{Handle, HandleKind};
use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize, Default)]
#[serde(default)]
struct TempParams {
    prefix: Option<String>,
}

pub(super) fn temp(state: &mut State, params: &Value) -> OpResult {
    let args: TempParams = parse_params(params)?;
    if let Some(prefix) = &args.prefix {
        if prefix.contains('/') {
            return Err(OpError::arg("prefix must not contain path separators"));
        }
    }

    let backing = tempfile::tempfile()?;
    let h = state.alloc(Handle::new(HandleKind::Temp, true, true, false, backing));
    Ok(json!({ "handle": h }))
}
