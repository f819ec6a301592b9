//! Session state owned by the dispatch task.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io;

use crate::server::admission::Allowlist;
use crate::server::handle::Handle;

/// Default cap on the bytes a single `read` may return.
pub const DEFAULT_CHUNK_CAP: usize = 4096;

/// Handle ids start here and are never reissued within a session.
pub const FIRST_HANDLE: u64 = 1;

/// The server's whole mutable state. Owned by exactly one task; no handler
/// runs concurrently with another.
pub struct State {
    next_handle: u64,
    handles: HashMap<u64, Handle>,
    allowlist: Allowlist,
    /// Set once the allowlist came from argv or a first `init`.
    allowlist_locked: bool,
    read_only: bool,
    /// Shadow map: virtualized name -> anonymous backing. The backing is
    /// shared by every handle opened on the same name.
    virtuals: HashMap<String, File>,
    chunk_cap: usize,
}

impl State {
    pub fn new(allowlist: Option<Allowlist>, chunk_cap: usize) -> Self {
        let (allowlist, locked) = match allowlist {
            Some(list) => (list, true),
            None => (Allowlist::default(), false),
        };
        Self {
            next_handle: FIRST_HANDLE,
            handles: HashMap::new(),
            allowlist,
            allowlist_locked: locked,
            read_only: false,
            virtuals: HashMap::new(),
            chunk_cap,
        }
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    pub fn allowlist_locked(&self) -> bool {
        self.allowlist_locked
    }

    /// Install the allowlist from a first `init`. Callers must check
    /// [`State::allowlist_locked`] first.
    pub fn install_allowlist(&mut self, list: Allowlist) {
        self.allowlist = list;
        self.allowlist_locked = true;
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// `read_only` can only ever tighten.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    pub fn chunk_cap(&self) -> usize {
        self.chunk_cap
    }

    /// Allocate the next handle id. Ids are monotonic and never reused.
    pub fn alloc(&mut self, handle: Handle) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, handle);
        id
    }

    pub fn handle_mut(&mut self, id: u64) -> Option<&mut Handle> {
        self.handles.get_mut(&id)
    }

    pub fn handle(&self, id: u64) -> Option<&Handle> {
        self.handles.get(&id)
    }

    /// Remove a handle; the id stays burned.
    pub fn release(&mut self, id: u64) -> Option<Handle> {
        self.handles.remove(&id)
    }

    pub fn open_handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Fetch or create the anonymous backing for a virtualized name.
    pub fn virtual_backing(&mut self, name: &str) -> io::Result<&File> {
        match self.virtuals.entry(name.to_owned()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(tempfile::tempfile()?)),
        }
    }

    /// Whether a name already has a virtual backing.
    pub fn has_virtual(&self, name: &str) -> bool {
        self.virtuals.contains_key(name)
    }

    /// Replace the backing for a name (truncating `w` open semantics).
    pub fn replace_virtual_backing(&mut self, name: &str) -> io::Result<&File> {
        let backing = tempfile::tempfile()?;
        match self.virtuals.entry(name.to_owned()) {
            Entry::Occupied(mut entry) => {
                entry.insert(backing);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(backing)),
        }
    }
}
