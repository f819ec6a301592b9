//! Length-prefixed framing over an async byte stream.
//!
//! A frame is a 4-byte big-endian unsigned length followed by exactly that
//! many payload bytes. Frames are atomic: a reader consumes the full payload
//! before interpreting it, a writer never interleaves frames.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame payload. Larger lengths are treated as a
/// corrupted stream, not as a request to allocate.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Transport-fatal framing failures. Any of these closes the connection.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("transport: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected EOF in length header (read {got} of 4)")]
    TruncatedHeader { got: usize },
    #[error("unexpected EOF in frame body (read {got} of {want} bytes)")]
    TruncatedBody { got: usize, want: usize },
    #[error("frame length {len} exceeds maximum {MAX_FRAME_LEN}")]
    Oversize { len: usize },
}

/// Read one frame. `Ok(None)` is a clean EOF on a frame boundary; EOF inside
/// a frame is an error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut got = 0;
    while got < header.len() {
        let n = reader.read(&mut header[got..]).await?;
        if n == 0 {
            if got == 0 {
                return Ok(None);
            }
            return Err(FrameError::TruncatedHeader { got });
        }
        got += n;
    }

    let len = BigEndian::read_u32(&header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::Oversize { len });
    }

    let mut payload = vec![0u8; len];
    let mut off = 0;
    while off < len {
        let n = reader.read(&mut payload[off..]).await?;
        if n == 0 {
            return Err(FrameError::TruncatedBody { got: off, want: len });
        }
        off += n;
    }
    Ok(Some(payload))
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::Oversize { len: payload.len() });
    }
    let mut header = [0u8; 4];
    BigEndian::write_u32(&mut header, payload.len() as u32);
    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
