//! MessagePack-RPC client over TCP.
//!
//! This module provides `RpcClient`, an async client that sends one request
//! at a time and waits for the matching response. It applies no deadline of
//! its own; see [`crate::rpc::call`] for the timed call.

use serde::{Deserialize, Serialize};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::json::to_json_string;
use crate::error::{Error, Result};
use crate::rpc::framing::{read_message, write_message};
use crate::value::Value;

/// Message type tag of a request.
pub const REQUEST: u8 = 0;
/// Message type tag of a response.
pub const RESPONSE: u8 = 1;

/// `[type, msgid, method, params]`
#[derive(Debug, Serialize)]
struct RequestFrame<'a>(u8, u32, &'a str, &'a [Value]);

/// `[type, msgid, error, result]`
#[derive(Debug, Deserialize)]
struct ResponseFrame(u8, u32, Value, Value);

/// MessagePack-RPC client bound to one TCP connection.
///
/// The connection is closed when the client is dropped.
///
/// # Example
///
/// ```ignore
/// use msgpack_cli::rpc::RpcClient;
/// use msgpack_cli::Value;
///
/// let mut client = RpcClient::connect("localhost", 18800).await?;
/// let sum = client.call("sum", &[Value::Int(1), Value::Int(2)]).await?;
/// ```
pub struct RpcClient {
    /// Read half of the connection.
    reader: OwnedReadHalf,
    /// Write half of the connection.
    writer: OwnedWriteHalf,
    /// Bytes received but not yet consumed.
    buffer: Vec<u8>,
    /// ID of the next request.
    next_id: u32,
}

impl RpcClient {
    /// Connect to a MessagePack-RPC server.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the host cannot be resolved or the
    /// connection is refused.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(Error::Transport)?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}:{}", host, port);

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: read_half,
            writer: write_half,
            buffer: Vec::new(),
            next_id: 1,
        })
    }

    /// Call a method with positional arguments and wait for the reply.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Connection is lost (`Error::Io` / `Error::Protocol`)
    /// - Server returns an error (`Error::Remote`)
    /// - The response is malformed or mismatched (`Error::Protocol`)
    pub async fn call(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        let id = self.take_id();

        write_message(&mut self.writer, &RequestFrame(REQUEST, id, method, args)).await?;
        debug!("Sent request {} for method {}", id, method);

        let response: ResponseFrame = read_message(&mut self.reader, &mut self.buffer).await?;
        debug!("Received response {}", response.1);

        process_response(id, response)
    }

    /// Take the next request ID; IDs wrap around after `u32::MAX`.
    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

/// Check a response against its request and extract result or error.
fn process_response(id: u32, response: ResponseFrame) -> Result<Value> {
    let ResponseFrame(kind, msgid, error, result) = response;

    if kind != RESPONSE {
        return Err(Error::Protocol(format!("Unexpected message type {}", kind)));
    }
    if msgid != id {
        return Err(Error::Protocol(format!(
            "Response id {} does not match request id {}",
            msgid, id
        )));
    }
    if !error.is_null() {
        return Err(Error::Remote(describe_error(error)));
    }

    Ok(result)
}

/// Render a remote error value as text.
fn describe_error(error: Value) -> String {
    match error {
        Value::String(message) => message,
        other => {
            let kind = other.kind();
            to_json_string(other, false).unwrap_or_else(|_| format!("unprintable {} error", kind))
        }
    }
}
