//! MessagePack codec.

use std::io::{BufRead, Write};

use serde::Deserialize;

use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result, Stage};
use crate::value::Value;

/// Decodes a stream of concatenated MessagePack values.
pub struct MsgpackDecoder<R: BufRead> {
    reader: R,
}

impl<R: BufRead> MsgpackDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Decoder for MsgpackDecoder<R> {
    fn decode(&mut self) -> Result<Option<Value>> {
        // Peek so a clean end of input is told apart from a truncated value
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        // rmp_serde reads exactly one value and never past it, so a fresh
        // deserializer per call leaves the stream at the next value
        let mut deserializer = rmp_serde::Deserializer::new(&mut self.reader);
        Value::deserialize(&mut deserializer)
            .map(Some)
            .map_err(|e| Error::format(Stage::MsgpackDecoding, e))
    }
}

/// Encodes values as MessagePack.
pub struct MsgpackEncoder<W: Write> {
    writer: W,
}

impl<W: Write> MsgpackEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Encoder for MsgpackEncoder<W> {
    fn encode(&mut self, value: Value) -> Result<()> {
        // Serialize first so writer failures surface as I/O errors
        let bytes = to_vec(&value)?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Encode a single value to a byte vector.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| Error::format(Stage::MsgpackEncoding, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stream_of_values() {
        let mut bytes = to_vec(&Value::Int(1)).unwrap();
        bytes.extend(to_vec(&Value::from("two")).unwrap());
        bytes.extend(to_vec(&Value::Array(vec![Value::Float(3.5), Value::Null])).unwrap());

        let mut decoder = MsgpackDecoder::new(bytes.as_slice());
        assert_eq!(decoder.decode().unwrap(), Some(Value::Int(1)));
        assert_eq!(decoder.decode().unwrap(), Some(Value::from("two")));
        assert_eq!(
            decoder.decode().unwrap(),
            Some(Value::Array(vec![Value::Float(3.5), Value::Null]))
        );
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_empty_input_is_exhausted() {
        let mut decoder = MsgpackDecoder::new(&[][..]);
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_truncated_value_fails() {
        let mut bytes = to_vec(&Value::from("a longer string")).unwrap();
        bytes.truncate(5);

        let mut decoder = MsgpackDecoder::new(bytes.as_slice());
        let err = decoder.decode().unwrap_err();
        assert!(err.to_string().starts_with("Msgpack decoding:"), "got {}", err);
    }

    #[test]
    fn test_encoder_roundtrip_nested() {
        let mut inner = Map::new();
        inner.insert("k".to_string(), Value::Array(vec![Value::Int(-1), Value::Bool(true)]));
        let value = Value::Array(vec![Value::Map(inner), Value::Float(-4.8e-8)]);

        let mut encoder = MsgpackEncoder::new(Vec::new());
        encoder.encode(value.clone()).unwrap();
        let bytes = encoder.into_inner();

        let mut decoder = MsgpackDecoder::new(bytes.as_slice());
        assert_eq!(decoder.decode().unwrap(), Some(value));
    }

    #[test]
    fn test_encode_literal_fails() {
        let mut encoder = MsgpackEncoder::new(Vec::new());
        let err = encoder.encode(Value::Literal("1".to_string())).unwrap_err();
        assert!(err.to_string().starts_with("Msgpack encoding:"), "got {}", err);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let mut encoder = MsgpackEncoder::new(BrokenPipe);
        let err = encoder.encode(Value::from("payload")).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got {:?}", err);
    }
}
