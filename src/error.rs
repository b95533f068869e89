//! Error types shared by every stage of conversion and RPC.
//!
//! Each variant renders with a short stage label so the boundary layer can
//! print it as-is.

use std::fmt;

use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Codec stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    JsonDecoding,
    JsonEncoding,
    MsgpackDecoding,
    MsgpackEncoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::JsonDecoding => "JSON decoding",
            Stage::JsonEncoding => "JSON encoding",
            Stage::MsgpackDecoding => "Msgpack decoding",
            Stage::MsgpackEncoding => "Msgpack encoding",
        };
        f.write_str(label)
    }
}

/// Errors raised while converting data or performing an RPC call.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading from or writing to a stream failed.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Malformed input on decode, or a value that cannot be encoded.
    #[error("{stage}: {message}")]
    Format { stage: Stage, message: String },

    /// A JSON number literal does not fit the numeric kind it was classified as.
    #[error("JSON decoding: cannot convert number {literal:?}: {message}")]
    NumberConversion { literal: String, message: String },

    /// The RPC connection could not be established.
    #[error("RPC connection failed: {0}")]
    Transport(#[source] std::io::Error),

    /// The peer violated MessagePack-RPC framing.
    #[error("RPC error: {0}")]
    Protocol(String),

    /// The server answered the call with an error.
    #[error("RPC error: {0}")]
    Remote(String),

    /// No reply arrived before the deadline.
    #[error("RPC call timed out after {0}s")]
    Timeout(u64),

    /// Malformed user-supplied argument.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl Error {
    /// Create a format error for the given stage.
    pub fn format(stage: Stage, message: impl fmt::Display) -> Self {
        Self::Format {
            stage,
            message: message.to_string(),
        }
    }

    /// Create a number conversion error for a literal.
    pub fn number_conversion(literal: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::NumberConversion {
            literal: literal.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::AddrNotAvailable
            | std::io::ErrorKind::NotConnected => Error::Transport(err),
            _ => Error::Io(err),
        }
    }
}
