//! Encoders and decoders over the value model.
//!
//! Both formats expose the same pair of capabilities:
//!
//! - [`Decoder`] reads one top-level value per call and returns `Ok(None)`
//!   once the input is exhausted.
//! - [`Encoder`] writes one top-level value per call.
//!
//! ```text
//! bytes ──► Decoder ──► Value ──► Encoder ──► bytes
//! ```

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::options::ConversionOptions;
use crate::value::Value;

pub mod json;
pub mod msgpack;

pub use json::{JsonDecoder, JsonEncoder};
pub use msgpack::{MsgpackDecoder, MsgpackEncoder};

/// Reads a stream of top-level values.
pub trait Decoder {
    /// Decode the next value.
    ///
    /// Returns `Ok(None)` when the input ends before any byte of a new value
    /// has been read. Input ending inside a value is an error.
    fn decode(&mut self) -> Result<Option<Value>>;
}

/// Writes a stream of top-level values.
pub trait Encoder {
    /// Encode one value. The value is consumed.
    fn encode(&mut self, value: Value) -> Result<()>;

    /// Flush buffered output to the underlying writer.
    fn flush(&mut self) -> Result<()>;
}

/// Wire format of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Msgpack,
}

impl Format {
    /// Build a decoder for this format reading from `reader`.
    pub fn decoder<'a, R: BufRead + 'a>(
        self,
        reader: R,
        options: &ConversionOptions,
    ) -> Box<dyn Decoder + 'a> {
        match self {
            Format::Json => Box::new(JsonDecoder::new(reader, options.convert_numbers)),
            Format::Msgpack => Box::new(MsgpackDecoder::new(reader)),
        }
    }

    /// Build an encoder for this format writing to `writer`.
    pub fn encoder<'a, W: Write + 'a>(
        self,
        writer: W,
        options: &ConversionOptions,
    ) -> Box<dyn Encoder + 'a> {
        match self {
            Format::Json => Box::new(JsonEncoder::new(writer, options.indent)),
            Format::Msgpack => Box::new(MsgpackEncoder::new(writer)),
        }
    }
}
