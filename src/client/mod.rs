//! The client side of the VFS: a file-like API mediated into server
//! requests.
//!
//! The client owns the virtualization bookkeeping: it knows which paths the
//! user injected at startup, records which names the session virtualized,
//! and names temp objects. The server enforces the allowlist; the client
//! enforces its own narrower handle views locally, without a round-trip.

pub mod handle;
#[cfg(unix)]
pub mod inherit;
pub mod transport;


use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::proto::{decode_data, encode_data, ErrorCode, FrameError};
use crate::server::admission::normalize_lexical;

pub use handle::FileView;
pub use transport::Connection;

/// The client's view of a failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a canonical protocol error.
    #[error("server error {code}: {message}")]
    Server { code: ErrorCode, message: String },
    /// A local mode-wrapper violation; the server was never contacted.
    #[error("handle is not open for {0}")]
    Mode(&'static str),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("response id {got} does not match request id {want}")]
    IdMismatch { want: String, got: String },
    #[error("failed response without an error body")]
    MissingErrorBody,
    #[error("result is missing field {0}")]
    MalformedResult(&'static str),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl ClientError {
    /// The canonical code, when the failure came from the server.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Logical open modes, mapped one-to-one onto the wire modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
    ReadWrite,
}

impl OpenMode {
    fn as_wire(&self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::Append => "a",
            OpenMode::ReadWrite => "rw",
        }
    }

    fn allows_read(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    fn allows_write(&self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::Append | OpenMode::ReadWrite)
    }
}

/// `stat` result.
#[derive(Debug, Clone, Deserialize)]
pub struct StatInfo {
    pub size: u64,
    pub mtime: i64,
    pub kind: String,
}

/// What a logical name refers to, for [`Client::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalKind {
    Injected,
    Virtual,
    Temp,
}

/// One entry of the client's logical file inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalEntry {
    pub name: String,
    pub kind: LogicalKind,
}

#[derive(Default)]
struct Names {
    virtuals: BTreeSet<String>,
    temps: Vec<String>,
}

/// The file proxy one process holds. Independent clients (parent, children)
/// point at the same server and hold independent handle bookkeeping.
pub struct Client {
    conn: Connection,
    injected: BTreeSet<PathBuf>,
    virtual_mode: bool,
    names: Mutex<Names>,
    open_handles: Mutex<BTreeSet<u64>>,
}

impl Client {
    /// `injected` is the set of user-declared real paths; in virtual mode
    /// every other name the LLM opens is expected to shadow, not touch, the
    /// host filesystem.
    pub fn new(conn: Connection, injected: Vec<PathBuf>, virtual_mode: bool) -> Self {
        let injected = injected.iter().map(|p| normalize_lexical(p)).collect();
        Self {
            conn,
            injected,
            virtual_mode,
            names: Mutex::new(Names::default()),
            open_handles: Mutex::new(BTreeSet::new()),
        }
    }

    /// The injected allowlist, for propagation to children. Never widened.
    pub fn injected(&self) -> impl Iterator<Item = &Path> {
        self.injected.iter().map(PathBuf::as_path)
    }

    pub fn is_injected(&self, path: &str) -> bool {
        self.injected.contains(&normalize_lexical(Path::new(path)))
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.conn.call("ping", Value::Null).await.map(|_| ())
    }

    /// Forward allowlists and the read-only flag to the server.
    pub async fn init(
        &self,
        allow_read: &[PathBuf],
        allow_write: &[PathBuf],
        read_only: bool,
    ) -> Result<(), ClientError> {
        let params = json!({
            "allow_read": allow_read.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            "allow_write": allow_write.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            "read_only": read_only,
        });
        self.conn.call("init", params).await.map(|_| ())
    }

    /// Open a logical name. In virtual mode, non-injected names are recorded
    /// as virtualized; the server shadows them with anonymous backings.
    pub async fn open(&self, path: &str, mode: OpenMode) -> Result<FileView, ClientError> {
        let virtualized = self.virtual_mode && !self.is_injected(path);

        let result =
            self.conn.call("open", json!({"path": path, "mode": mode.as_wire()})).await?;
        let h = result_field_u64(&result, "handle")?;

        if virtualized {
            self.names.lock().expect("names lock").virtuals.insert(path.to_owned());
            debug!(path, handle = h, "opened virtualized name");
        }
        self.open_handles.lock().expect("handles lock").insert(h);
        Ok(FileView::new(h, mode.allows_read(), mode.allows_write()))
    }

    /// Read at most `max` bytes. Returns the chunk and the eof flag.
    pub async fn read(&self, view: &FileView, max: usize) -> Result<(Vec<u8>, bool), ClientError> {
        if !view.allows_read() {
            return Err(ClientError::Mode("reading"));
        }
        let result = self.conn.call("read", json!({"h": view.id(), "max": max})).await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .and_then(decode_data)
            .ok_or(ClientError::MalformedResult("data"))?;
        let eof = result.get("eof").and_then(Value::as_bool).unwrap_or(false);
        Ok((data, eof))
    }

    /// Drain a handle by chunked reads.
    pub async fn read_to_end(&self, view: &FileView) -> Result<Vec<u8>, ClientError> {
        let mut out = Vec::new();
        loop {
            let (chunk, eof) = self.read(view, crate::server::state::DEFAULT_CHUNK_CAP).await?;
            out.extend_from_slice(&chunk);
            if eof {
                return Ok(out);
            }
        }
    }

    /// Write one chunk; the server may accept fewer bytes than offered.
    pub async fn write(&self, view: &FileView, data: &[u8]) -> Result<usize, ClientError> {
        if !view.allows_write() {
            return Err(ClientError::Mode("writing"));
        }
        let result =
            self.conn.call("write", json!({"h": view.id(), "data": encode_data(data)})).await?;
        result_field_u64(&result, "written").map(|n| n as usize)
    }

    /// Loop until every byte is accepted.
    pub async fn write_all(&self, view: &FileView, data: &[u8]) -> Result<(), ClientError> {
        let mut off = 0;
        while off < data.len() {
            let n = self.write(view, &data[off..]).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            off += n;
        }
        Ok(())
    }

    pub async fn stat(&self, view: &FileView) -> Result<StatInfo, ClientError> {
        let result = self.conn.call("stat", json!({"h": view.id()})).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close consumes the view; a second close through a narrowed copy is a
    /// server-reported `E_CLOSED`, same as the protocol contract.
    pub async fn close(&self, view: FileView) -> Result<(), ClientError> {
        self.conn.call("close", json!({"h": view.id()})).await?;
        self.open_handles.lock().expect("handles lock").remove(&view.id());
        Ok(())
    }

    /// Create an anonymous rw temp object. Returns the view and the logical
    /// tag; the backing has no filesystem path the caller can see.
    pub async fn create_temp(&self, prefix: Option<&str>) -> Result<(FileView, String), ClientError> {
        let params = match prefix {
            Some(p) => json!({"prefix": p}),
            None => Value::Null,
        };
        let result = self.conn.call("temp", params).await?;
        let h = result_field_u64(&result, "handle")?;
        let tag = format!("<tmp-{h}>");
        self.names.lock().expect("names lock").temps.push(tag.clone());
        self.open_handles.lock().expect("handles lock").insert(h);
        Ok((FileView::new(h, true, true), tag))
    }

    /// The client-side inventory of logical files. The server has no
    /// enumeration op; this is everything the session has named.
    pub fn list(&self) -> Vec<LogicalEntry> {
        let names = self.names.lock().expect("names lock");
        let mut out: Vec<LogicalEntry> = self
            .injected
            .iter()
            .map(|p| LogicalEntry {
                name: p.to_string_lossy().into_owned(),
                kind: LogicalKind::Injected,
            })
            .collect();
        out.extend(
            names
                .virtuals
                .iter()
                .map(|n| LogicalEntry { name: n.clone(), kind: LogicalKind::Virtual }),
        );
        out.extend(names.temps.iter().map(|t| LogicalEntry { name: t.clone(), kind: LogicalKind::Temp }));
        out
    }

    /// Best-effort close of every handle this client still tracks.
    pub async fn close_all(&self) {
        let handles: Vec<u64> = {
            let set = self.open_handles.lock().expect("handles lock");
            set.iter().copied().collect()
        };
        for h in handles {
            let _ = self.conn.call("close", json!({"h": h})).await;
            self.open_handles.lock().expect("handles lock").remove(&h);
        }
    }
}

fn result_field_u64(result: &Value, field: &'static str) -> Result<u64, ClientError> {
    result.get(field).and_then(Value::as_u64).ok_or(ClientError::MalformedResult(field))
}
