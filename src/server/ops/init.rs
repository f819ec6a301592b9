//! The `init` operation.
//!
//! Allowlists are supplied once per session. A server started with `-i`/`-o`
//! flags keeps them; `init` then only validates its params and acknowledges.
//! A server started bare takes its lists from the first `init`; later lists
//! are ignored. `read_only` can only tighten.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::server::admission::Allowlist;
use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize, Default)]
#[serde(default)]
struct InitParams {
    allow_read: Vec<String>,
    allow_write: Vec<String>,
    read_only: Option<bool>,
}

pub(super) fn init(state: &mut State, params: &Value) -> OpResult {
    let args: InitParams = parse_params(params)?;
    let has_lists = !args.allow_read.is_empty() || !args.allow_write.is_empty();

    if has_lists && !state.allowlist_locked() {
        let read: Vec<PathBuf> = args.allow_read.iter().map(PathBuf::from).collect();
        let write: Vec<PathBuf> = args.allow_write.iter().map(PathBuf::from).collect();
        let list = Allowlist::new(read, write).map_err(|err| OpError::arg(err.to_string()))?;
        let (r, w) = list.sizes();
        info!(readable = r, writable = w, "allowlist installed via init");
        state.install_allowlist(list);
    }

    if args.read_only == Some(true) {
        state.set_read_only();
    }

    Ok(json!({ "status": "ready" }))
}
