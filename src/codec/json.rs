//! JSON codec.
//!
//! Decoding goes through `serde_json::Value` with arbitrary precision numbers
//! so the literal text of every number survives until normalization.
//! Nesting is capped at [`MAX_NESTING_DEPTH`] levels, the same depth
//! rmp-serde accepts for MessagePack input.

use std::io::{self, BufRead, Read, Write};

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;

use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result, Stage};
use crate::normalize::{normalize, parse_float};
use crate::value::Value;

/// Deepest array/object nesting accepted on input.
pub const MAX_NESTING_DEPTH: usize = 1024;

#[derive(Debug, thiserror::Error)]
#[error("nesting exceeds {0} levels")]
struct NestingTooDeep(usize);

/// Reader that fails once brackets outside strings nest deeper than `limit`.
///
/// serde_json's own recursion limit is disabled, so this bounds the stack.
struct DepthLimit<R> {
    inner: R,
    limit: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl<R> DepthLimit<R> {
    fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            limit,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    fn track(&mut self, byte: u8) -> io::Result<()> {
        if self.in_string {
            match byte {
                _ if self.escaped => self.escaped = false,
                b'\\' => self.escaped = true,
                b'"' => self.in_string = false,
                _ => {}
            }
            return Ok(());
        }

        match byte {
            b'"' => self.in_string = true,
            b'[' | b'{' => {
                self.depth += 1;
                if self.depth > self.limit {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        NestingTooDeep(self.limit),
                    ));
                }
            }
            b']' | b'}' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        Ok(())
    }
}

impl<R: Read> Read for DepthLimit<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for &byte in &buf[..n] {
            self.track(byte)?;
        }
        Ok(n)
    }
}

/// Decodes a stream of concatenated JSON documents.
pub struct JsonDecoder<R: BufRead> {
    stream: StreamDeserializer<'static, IoRead<DepthLimit<R>>, serde_json::Value>,
    convert_numbers: bool,
}

impl<R: BufRead> JsonDecoder<R> {
    /// Create a decoder.
    ///
    /// With `convert_numbers` each number becomes an integer or a float
    /// depending on its spelling; without it every number is a float.
    pub fn new(reader: R, convert_numbers: bool) -> Self {
        let mut deserializer =
            serde_json::Deserializer::from_reader(DepthLimit::new(reader, MAX_NESTING_DEPTH));
        deserializer.disable_recursion_limit();
        Self {
            stream: deserializer.into_iter(),
            convert_numbers,
        }
    }
}

impl<R: BufRead> Decoder for JsonDecoder<R> {
    fn decode(&mut self) -> Result<Option<Value>> {
        let raw = match self.stream.next() {
            None => return Ok(None),
            Some(Ok(raw)) => raw,
            Some(Err(e)) if e.is_io() => return Err(read_error(e.into())),
            Some(Err(e)) => return Err(Error::format(Stage::JsonDecoding, e)),
        };

        let mut value = from_json(raw, self.convert_numbers)?;
        if self.convert_numbers {
            normalize(&mut value)?;
        }
        debug_assert!(value.is_normalized());
        Ok(Some(value))
    }
}

/// Classify an I/O failure surfaced by serde_json.
fn read_error(err: io::Error) -> Error {
    let too_deep = err
        .get_ref()
        .is_some_and(|inner| inner.is::<NestingTooDeep>());
    if too_deep {
        Error::format(Stage::JsonDecoding, err)
    } else {
        Error::from(err)
    }
}

/// Convert a parsed JSON tree into the value model.
///
/// Numbers are kept as literals when `keep_literals` is set, otherwise
/// parsed as floats.
fn from_json(raw: serde_json::Value, keep_literals: bool) -> Result<Value> {
    let value = match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(v) => Value::Bool(v),
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            if keep_literals {
                Value::Literal(text)
            } else {
                Value::Float(parse_float(&text)?)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| from_json(item, keep_literals))
                .collect::<Result<_>>()?,
        ),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(key, item)| Ok((key, from_json(item, keep_literals)?)))
                .collect::<Result<_>>()?,
        ),
    };
    Ok(value)
}

/// Encodes values as JSON, one per line.
pub struct JsonEncoder<W: Write> {
    writer: W,
    indent: bool,
}

impl<W: Write> JsonEncoder<W> {
    /// Create an encoder. With `indent` the output uses two-space indentation.
    pub fn new(writer: W, indent: bool) -> Self {
        Self { writer, indent }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Encoder for JsonEncoder<W> {
    fn encode(&mut self, value: Value) -> Result<()> {
        // serde_json would silently write NaN and infinities as null
        if let Some(v) = first_non_finite(&value) {
            return Err(Error::format(
                Stage::JsonEncoding,
                format!("unsupported float value {}", v),
            ));
        }

        let result = if self.indent {
            serde_json::to_writer_pretty(&mut self.writer, &value)
        } else {
            serde_json::to_writer(&mut self.writer, &value)
        };
        result.map_err(|e| {
            if e.is_io() {
                Error::from(io::Error::from(e))
            } else {
                Error::format(Stage::JsonEncoding, e)
            }
        })?;

        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn first_non_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) if !v.is_finite() => Some(*v),
        Value::Array(items) => items.iter().find_map(first_non_finite),
        Value::Map(map) => map.values().find_map(first_non_finite),
        _ => None,
    }
}

/// Render a single value as a JSON string without the trailing newline.
pub fn to_json_string(value: Value, indent: bool) -> Result<String> {
    let mut encoder = JsonEncoder::new(Vec::new(), indent);
    encoder.encode(value)?;
    let mut bytes = encoder.into_inner();
    bytes.pop();
    String::from_utf8(bytes).map_err(|e| Error::format(Stage::JsonEncoding, e))
}
