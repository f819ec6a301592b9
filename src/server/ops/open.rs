//! The `open` operation: mode parsing, admission, real and virtual opens.

use std::fs::OpenOptions;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::server::admission::{Admission, Direction};
use crate::server::handle::{Handle, HandleKind};
use crate::server::state::State;

use super::{parse_params, OpError, OpResult};

#[derive(Deserialize)]
struct OpenParams {
    path: String,
    mode: String,
}

/// Flags derived from the four open modes.
struct ModeFlags {
    readable: bool,
    writable: bool,
    append: bool,
    need_existing: bool,
    truncate: bool,
}

fn mode_flags(mode: &str) -> Result<ModeFlags, OpError> {
    let flags = match mode {
        "r" => ModeFlags {
            readable: true,
            writable: false,
            append: false,
            need_existing: true,
            truncate: false,
        },
        "w" => ModeFlags {
            readable: false,
            writable: true,
            append: false,
            need_existing: false,
            truncate: true,
        },
        "a" => ModeFlags {
            readable: false,
            writable: true,
            append: true,
            need_existing: false,
            truncate: false,
        },
        "rw" => ModeFlags {
            readable: true,
            writable: true,
            append: false,
            need_existing: false,
            truncate: false,
        },
        _ => return Err(OpError::arg("invalid mode")),
    };
    Ok(flags)
}

pub(super) fn open(state: &mut State, params: &Value) -> OpResult {
    let args: OpenParams = parse_params(params)?;
    let flags = mode_flags(&args.mode)?;

    if flags.writable && state.read_only() {
        return Err(OpError::perm("server is read-only"));
    }

    let direction = if flags.writable { Direction::Write } else { Direction::Read };
    match state.allowlist().admit(&args.path, direction) {
        Admission::Real(canonical) => {
            let mut opts = OpenOptions::new();
            opts.read(flags.readable).write(flags.writable);
            if flags.writable {
                opts.create(true);
            }
            if flags.truncate {
                opts.truncate(true);
            }
            let backing = opts.open(&canonical)?;
            let kind = HandleKind::File;
            let h = state.alloc(Handle::new(kind, flags.readable, flags.writable, flags.append, backing));
            debug!(handle = h, path = %canonical.display(), mode = %args.mode, "opened real file");
            Ok(json!({ "handle": h }))
        }
        Admission::Denied(reason) => Err(OpError::perm(reason)),
        Admission::Directory => Err(OpError::unsupported("directories are not supported")),
        Admission::Virtual => open_virtual(state, &args.path, &flags),
    }
}

/// Shadow the name with an anonymous backing. The host filesystem is never
/// touched at this name.
fn open_virtual(state: &mut State, name: &str, flags: &ModeFlags) -> OpResult {
    if flags.need_existing && !state.has_virtual(name) {
        // a read of a name nobody has written: register an empty backing so
        // the caller gets a handle whose reads answer eof
        state.virtual_backing(name)?;
    }

    let backing = if flags.truncate {
        state.replace_virtual_backing(name)?
    } else {
        state.virtual_backing(name)?
    };
    // independent handle offsets over the shared backing
    let dup = backing.try_clone()?;

    let h = state.alloc(Handle::new(
        HandleKind::Virtual,
        flags.readable,
        flags.writable,
        flags.append,
        dup,
    ));
    debug!(handle = h, name, "opened virtual backing");
    Ok(json!({ "handle": h }))
}
