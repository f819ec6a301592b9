//! The VFS daemon: a single-client request/response server over a framed
//! byte stream.
//!
//! The serve loop splits into three tasks joined by mpsc channels: a frame
//! reader decoding requests, a dispatcher owning the whole session [`State`],
//! and a reply writer. Each channel is FIFO and the dispatcher is single, so
//! responses leave in exactly the order requests arrived.

pub mod admission;
pub mod handle;
pub mod ops;
pub mod state;


use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::proto::{frame, ErrorCode, FrameError, Request, Response};

use admission::Allowlist;
use state::{State, DEFAULT_CHUNK_CAP};

/// Startup parameters for one server session.
pub struct ServerConfig {
    /// Allowlist from the command line, if any. `None` defers to `init`.
    pub allowlist: Option<Allowlist>,
    /// Per-read byte cap; requests beyond it are clamped silently.
    pub chunk_cap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { allowlist: None, chunk_cap: DEFAULT_CHUNK_CAP }
    }
}

/// Why the serve loop stopped.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Transport-fatal condition; the connection is closed without recovery.
    #[error(transparent)]
    Transport(#[from] FrameError),
    #[error("request frame is not valid JSON: {0}")]
    MalformedFrame(serde_json::Error),
    #[error("serve task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One decoded inbound frame, in arrival order.
enum Incoming {
    Request(Request),
    /// Valid JSON of the wrong envelope shape; answered `E_ARG` in turn.
    Malformed { id: String, message: String },
}

/// Reads frames from the transport and decodes request envelopes for the
/// [`Dispatcher`].
struct FrameReader<R> {
    reader: R,
    req_send: mpsc::Sender<Incoming>,
}

impl<R: AsyncRead + Unpin + Send + 'static> FrameReader<R> {
    fn spawn(reader: R, req_send: mpsc::Sender<Incoming>) -> JoinHandle<Result<(), ServeError>> {
        tokio::spawn(Self { reader, req_send }.run())
    }

    async fn run(mut self) -> Result<(), ServeError> {
        loop {
            let Some(payload) = frame::read_frame(&mut self.reader).await? else {
                debug!("clean EOF on transport");
                return Ok(());
            };

            // a frame body that is not JSON at all is transport-fatal
            let value: Value =
                serde_json::from_slice(&payload).map_err(ServeError::MalformedFrame)?;

            // valid JSON of the wrong shape answers E_ARG and the loop continues
            let id = value.get("id").and_then(Value::as_str).unwrap_or("?").to_owned();
            let incoming = match serde_json::from_value::<Request>(value) {
                Ok(req) => Incoming::Request(req),
                Err(err) => Incoming::Malformed { id, message: err.to_string() },
            };
            if self.req_send.send(incoming).await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Owns the session [`State`] and runs every handler, one request at a time,
/// in arrival order.
struct Dispatcher {
    state: State,
    req_recv: mpsc::Receiver<Incoming>,
    reply_send: mpsc::Sender<Response>,
}

impl Dispatcher {
    fn spawn(
        state: State,
        req_recv: mpsc::Receiver<Incoming>,
        reply_send: mpsc::Sender<Response>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self { state, req_recv, reply_send }.run())
    }

    async fn run(mut self) {
        while let Some(incoming) = self.req_recv.recv().await {
            let resp = match incoming {
                Incoming::Request(req) => ops::dispatch(&mut self.state, req),
                Incoming::Malformed { id, message } => {
                    Response::failure(id, ErrorCode::Arg, message)
                }
            };
            if self.reply_send.send(resp).await.is_err() {
                break;
            }
        }
        let open = self.state.open_handle_count();
        if open > 0 {
            info!(open, "handles still open at shutdown");
        }
    }
}

/// Serializes responses back onto the transport, in the order the
/// [`Dispatcher`] produced them.
struct ReplyWriter<W> {
    writer: W,
    reply_recv: mpsc::Receiver<Response>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> ReplyWriter<W> {
    fn spawn(writer: W, reply_recv: mpsc::Receiver<Response>) -> JoinHandle<Result<(), ServeError>> {
        tokio::spawn(Self { writer, reply_recv }.run())
    }

    async fn run(mut self) -> Result<(), ServeError> {
        while let Some(resp) = self.reply_recv.recv().await {
            let payload = match serde_json::to_vec(&resp) {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!(%err, "response serialization failed");
                    continue;
                }
            };
            frame::write_frame(&mut self.writer, &payload).await?;
        }
        Ok(())
    }
}

/// Serve one client over the given transport until EOF or a transport-fatal
/// error. All handles are freed when the loop returns.
pub async fn serve<R, W>(reader: R, writer: W, config: ServerConfig) -> Result<(), ServeError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    if let Some(list) = &config.allowlist {
        let (r, w) = list.sizes();
        info!(readable = r, writable = w, "serving with startup allowlist");
    } else {
        info!("serving without startup allowlist; waiting for init");
    }

    let state = State::new(config.allowlist, config.chunk_cap);

    let (req_send, req_recv) = mpsc::channel::<Incoming>(32);
    let (reply_send, reply_recv) = mpsc::channel::<Response>(32);

    let reader_task = FrameReader::spawn(reader, req_send);
    let dispatcher_task = Dispatcher::spawn(state, req_recv, reply_send);
    let writer_task = ReplyWriter::spawn(writer, reply_recv);

    let read_result = reader_task.await?;
    dispatcher_task.await?;
    let write_result = writer_task.await?;

    read_result?;
    write_result
}
