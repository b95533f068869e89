//! MessagePack-RPC calls with a client-side deadline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  oneshot   ┌───────────────┐      TCP       ┌──────────┐
//! │    call()    │ ◄───────── │  call task    │ ◄────────────► │  server  │
//! │ (select with │            │  (RpcClient)  │  MessagePack   │          │
//! │   timer)     │            └───────────────┘     -RPC       └──────────┘
//! └──────────────┘
//! ```
//!
//! Each call runs on its own task with its own connection and reports back
//! over a oneshot channel. The caller races that channel against a timer.
//! On timeout the caller stops waiting and the task closes its connection;
//! nothing is sent to the server, which may still carry out the call.
//!
//! # Usage
//!
//! ```ignore
//! use msgpack_cli::{rpc, ConversionOptions};
//!
//! let options = ConversionOptions::default();
//! let reply = rpc::call("localhost", 18800, "jobs.get", "42", &options).await?;
//! ```

mod client;
mod framing;
mod params;

pub use client::{RpcClient, REQUEST, RESPONSE};
pub use framing::{read_message, read_message_limited, write_message, MAX_MESSAGE_SIZE};
pub use params::{adjust_params, decode_params, parse_params};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::codec::json::to_json_string;
use crate::error::{Error, Result};
use crate::options::ConversionOptions;
use crate::value::Value;

/// A method call with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub args: Vec<Value>,
}

impl RpcRequest {
    /// # Errors
    ///
    /// Returns `Error::Argument` for an empty method name.
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Result<Self> {
        let method = method.into();
        if method.is_empty() {
            return Err(Error::Argument("RPC method name is empty".to_string()));
        }
        Ok(Self { method, args })
    }
}

/// Call `method` on `host:port` and wait at most `options.timeout()` for the
/// reply.
///
/// `params` is normalized with [`adjust_params`] first.
///
/// # Errors
///
/// Returns `Error::Timeout` if no reply arrives in time, plus any parameter,
/// transport, protocol or remote error.
pub async fn call(
    host: &str,
    port: u16,
    method: &str,
    params: &str,
    options: &ConversionOptions,
) -> Result<Value> {
    let args = parse_params(params, options)?;
    let request = RpcRequest::new(method, args)?;
    call_request(host, port, request, options).await
}

/// Perform a prepared request under the deadline from `options`.
pub async fn call_request(
    host: &str,
    port: u16,
    request: RpcRequest,
    options: &ConversionOptions,
) -> Result<Value> {
    if options.timeout_secs == 0 {
        return Err(Error::Argument("timeout must be greater than zero".to_string()));
    }

    let method = request.method.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(run_call(host.to_owned(), port, request, tx));

    tokio::select! {
        outcome = rx => match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Protocol("RPC task ended without a result".to_string())),
        },
        _ = tokio::time::sleep(options.timeout()) => {
            warn!("RPC call {} timed out after {}s", method, options.timeout_secs);
            Err(Error::Timeout(options.timeout_secs))
        }
    }
}

/// Body of the per-call task.
///
/// Gives up as soon as the caller stops listening; the connection is
/// dropped with the client on every path.
async fn run_call(
    host: String,
    port: u16,
    request: RpcRequest,
    mut tx: oneshot::Sender<Result<Value>>,
) {
    let outcome = tokio::select! {
        result = perform_call(&host, port, &request) => Some(result),
        _ = tx.closed() => None,
    };

    match outcome {
        Some(result) => {
            if tx.send(result).is_err() {
                debug!("Discarding result of {} received after the deadline", request.method);
            }
        }
        None => debug!("Caller stopped waiting for {}; closing connection", request.method),
    }
}

async fn perform_call(host: &str, port: u16, request: &RpcRequest) -> Result<Value> {
    let mut client = RpcClient::connect(host, port).await?;
    info!("Calling {} on {}:{}", request.method, host, port);
    client.call(&request.method, &request.args).await
}

/// Call a method and render the reply as JSON text.
pub async fn call_and_render(
    host: &str,
    port: u16,
    method: &str,
    params: &str,
    options: &ConversionOptions,
) -> Result<String> {
    let reply = call(host, port, method, params, options).await?;
    to_json_string(reply, options.indent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_method_rejected() {
        assert!(matches!(RpcRequest::new("", vec![]), Err(Error::Argument(_))));
        assert!(RpcRequest::new("ping", vec![]).is_ok());
    }

    #[tokio::test]
    async fn test_bad_params_fail_before_connecting() {
        // Rejected before any connection attempt
        let err = call("127.0.0.1", 9, "m", "[1", &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_call_task_exits_when_caller_stops_waiting() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            drop(stream);
        });

        let (tx, rx) = oneshot::channel();
        let request = RpcRequest::new("slow", vec![]).unwrap();
        let task = tokio::spawn(run_call("127.0.0.1".to_string(), port, request, tx));

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        drop(rx);

        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("Call task kept running after the caller left")
            .unwrap();
        server.abort();
    }
}
