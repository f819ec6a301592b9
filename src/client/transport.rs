//! Framed request/response transport to the VFS server.
//!
//! A [`Connection`] serializes whole round-trips behind one async mutex so
//! that concurrent callers in the hosting process never interleave frames.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use serde_json::Value;

use crate::proto::{frame, Request, Response};

use super::ClientError;

struct Inner {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    next_id: u64,
}

/// One client end of the server connection.
pub struct Connection {
    inner: Mutex<Inner>,
}

impl Connection {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                reader: Box::new(reader),
                writer: Box::new(writer),
                next_id: 1,
            }),
        }
    }

    /// Issue one request and wait for its response. The server does not
    /// reorder, so the next inbound frame answers this request.
    pub async fn call(&self, op: &str, params: Value) -> Result<Value, ClientError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id.to_string();
        inner.next_id += 1;

        let request = Request { id: id.clone(), op: op.to_owned(), params };
        let payload = serde_json::to_vec(&request)?;
        frame::write_frame(&mut inner.writer, &payload).await?;

        let Some(raw) = frame::read_frame(&mut inner.reader).await? else {
            return Err(ClientError::ConnectionClosed);
        };
        let response: Response = serde_json::from_slice(&raw)?;
        if response.id != id {
            return Err(ClientError::IdMismatch { want: id, got: response.id });
        }

        if response.ok {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            let body = response.error.ok_or(ClientError::MissingErrorBody)?;
            Err(ClientError::Server { code: body.code, message: body.message })
        }
    }
}
