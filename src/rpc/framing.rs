//! MessagePack message framing over stream sockets.
//!
//! MessagePack-RPC has no length prefix: a message ends where its top-level
//! MessagePack value ends. Incoming bytes are scanned marker by marker to
//! find that boundary before the message is deserialized.
//!
//! # Wire Format
//!
//! ```text
//! request:  [0, msgid, method, [arg, ...]]
//! response: [1, msgid, error, result]
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result, Stage};

/// Maximum message size (100MB) to prevent OOM from malicious/buggy servers.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Finds the end of the first MessagePack value in a growing buffer.
///
/// Scanning resumes where the previous call stopped, so feeding a buffer
/// chunk by chunk costs time linear in its final length.
#[derive(Debug)]
struct FrameScanner {
    /// Start of the next unscanned node.
    offset: usize,
    /// Nodes still to be scanned before the value is complete.
    pending: u64,
}

impl FrameScanner {
    fn new() -> Self {
        Self {
            offset: 0,
            pending: 1,
        }
    }

    /// Returns the length of the first complete value, or `None` if more
    /// bytes are needed.
    fn scan(&mut self, buf: &[u8], limit: usize) -> Result<Option<usize>> {
        while self.pending > 0 {
            // Every pending node takes at least one byte
            let remaining = limit.saturating_sub(self.offset) as u64;
            if self.pending > remaining {
                return Err(too_large(limit));
            }

            let Some(rest) = buf.get(self.offset..).filter(|rest| !rest.is_empty()) else {
                return Ok(None);
            };
            let Some((size, children)) = measure(rest)? else {
                return Ok(None);
            };
            if self.offset.saturating_add(size) > limit {
                return Err(too_large(limit));
            }
            if size > rest.len() {
                return Ok(None);
            }

            self.offset += size;
            self.pending = self.pending - 1 + children;
        }
        Ok(Some(self.offset))
    }
}

fn too_large(limit: usize) -> Error {
    Error::Protocol(format!("Message exceeds maximum {} bytes", limit))
}

/// Size of the node starting at `buf[0]` excluding its children, and the
/// number of child nodes that follow it.
///
/// Returns `None` if the length field is not fully buffered yet.
fn measure(buf: &[u8]) -> Result<Option<(usize, u64)>> {
    let marker = buf[0];
    let len = |width: usize| -> Option<usize> {
        buf.get(1..1 + width)
            .map(|bytes| bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b)))
    };

    let node = match marker {
        // fixints, nil, false, true
        0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => Some((1, 0)),
        0x80..=0x8f => Some((1, 2 * u64::from(marker & 0x0f))),
        0x90..=0x9f => Some((1, u64::from(marker & 0x0f))),
        0xa0..=0xbf => Some((1 + usize::from(marker & 0x1f), 0)),
        // bin / str
        0xc4 | 0xd9 => len(1).map(|n| (2 + n, 0)),
        0xc5 | 0xda => len(2).map(|n| (3 + n, 0)),
        0xc6 | 0xdb => len(4).map(|n| (5 + n, 0)),
        // ext carries a type byte after the length
        0xc7 => len(1).map(|n| (3 + n, 0)),
        0xc8 => len(2).map(|n| (4 + n, 0)),
        0xc9 => len(4).map(|n| (6 + n, 0)),
        0xca => Some((5, 0)),
        0xcb => Some((9, 0)),
        0xcc | 0xd0 => Some((2, 0)),
        0xcd | 0xd1 => Some((3, 0)),
        0xce | 0xd2 => Some((5, 0)),
        0xcf | 0xd3 => Some((9, 0)),
        // fixext 1, 2, 4, 8, 16
        0xd4 => Some((3, 0)),
        0xd5 => Some((4, 0)),
        0xd6 => Some((6, 0)),
        0xd7 => Some((10, 0)),
        0xd8 => Some((18, 0)),
        0xdc => len(2).map(|n| (3, n as u64)),
        0xdd => len(4).map(|n| (5, n as u64)),
        0xde => len(2).map(|n| (3, 2 * n as u64)),
        0xdf => len(4).map(|n| (5, 2 * n as u64)),
        0xc1 => return Err(Error::Protocol("Invalid MessagePack marker 0xc1".to_string())),
    };
    Ok(node)
}

/// Read one MessagePack message from the stream.
///
/// Bytes read past the end of the message stay in `buffer` for the next
/// call. A reset or dropped connection is reported as `Error::Transport`.
///
/// # Errors
///
/// Returns an error if:
/// - The stream is closed (EOF) before a full message arrives
/// - The message exceeds MAX_MESSAGE_SIZE (100MB)
/// - The message does not deserialize into `T`
pub async fn read_message<R, T>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    read_message_limited(reader, buffer, MAX_MESSAGE_SIZE).await
}

/// [`read_message`] with an explicit size limit.
pub async fn read_message_limited<R, T>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    limit: usize,
) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut scanner = FrameScanner::new();

    loop {
        if let Some(len) = scanner.scan(buffer, limit)? {
            let message = rmp_serde::from_slice(&buffer[..len])
                .map_err(|e| Error::Protocol(format!("Malformed message: {}", e)))?;
            buffer.drain(..len);
            return Ok(message);
        }

        let bytes_read = reader.read_buf(buffer).await?;

        // EOF - connection closed
        if bytes_read == 0 {
            let reason = if buffer.is_empty() {
                "Connection closed by server"
            } else {
                "Connection closed in the middle of a message"
            };
            return Err(Error::Protocol(reason.to_string()));
        }
    }
}

/// Write one message to the stream and flush it.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = rmp_serde::to_vec(message).map_err(|e| Error::format(Stage::MsgpackEncoding, e))?;

    writer.write_all(&body).await?;
    writer.flush().await?;

    Ok(())
}
