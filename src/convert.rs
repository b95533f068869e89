//! Streaming conversion between JSON and MessagePack.
//!
//! Values are translated one at a time: only the value currently being
//! converted is held in memory.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::codec::{Decoder, Encoder, Format};
use crate::error::Result;
use crate::options::ConversionOptions;

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// JSON to MessagePack.
    Encode,
    /// MessagePack to JSON.
    Decode,
}

impl Direction {
    pub fn input_format(self) -> Format {
        match self {
            Direction::Encode => Format::Json,
            Direction::Decode => Format::Msgpack,
        }
    }

    pub fn output_format(self) -> Format {
        match self {
            Direction::Encode => Format::Msgpack,
            Direction::Decode => Format::Json,
        }
    }
}

/// Re-encode every value the decoder yields until the input is exhausted.
///
/// Stops at the first decode or encode error. Returns the number of values
/// converted.
pub fn convert<D, E>(decoder: &mut D, encoder: &mut E) -> Result<usize>
where
    D: Decoder + ?Sized,
    E: Encoder + ?Sized,
{
    let mut count = 0;
    while let Some(value) = decoder.decode()? {
        encoder.encode(value)?;
        count += 1;
    }
    encoder.flush()?;
    Ok(count)
}

/// Convert `reader` to `writer` in the given direction.
pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    direction: Direction,
    options: &ConversionOptions,
) -> Result<usize> {
    let mut decoder = direction.input_format().decoder(reader, options);
    let mut encoder = direction.output_format().encoder(writer, options);

    let count = convert(decoder.as_mut(), encoder.as_mut())?;
    debug!("Converted {} value(s) ({:?})", count, direction);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::msgpack::to_vec;
    use crate::error::Error;
    use crate::value::{Map, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_json_values_become_two_msgpack_values() {
        let input = br#"{"a": 1} [2.5, "x"]"#;
        let mut output = Vec::new();

        let count = run(&input[..], &mut output, Direction::Encode, &ConversionOptions::default())
            .unwrap();
        assert_eq!(count, 2);

        let mut map = Map::new();
        map.insert("a".to_string(), Value::Int(1));
        let mut expected = to_vec(&Value::Map(map)).unwrap();
        expected.extend(to_vec(&Value::Array(vec![Value::Float(2.5), Value::from("x")])).unwrap());
        assert_eq!(output, expected);
    }

    #[test]
    fn test_msgpack_to_json() {
        let mut input = to_vec(&Value::Int(7)).unwrap();
        input.extend(to_vec(&Value::Array(vec![Value::Bool(false)])).unwrap());
        let mut output = Vec::new();

        let count = run(
            input.as_slice(),
            &mut output,
            Direction::Decode,
            &ConversionOptions::default(),
        )
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(output).unwrap(), "7\n[false]\n");
    }

    #[test]
    fn test_empty_input_converts_nothing() {
        let mut output = Vec::new();
        let count =
            run(&b""[..], &mut output, Direction::Encode, &ConversionOptions::default()).unwrap();
        assert_eq!(count, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_decode_error_stops_after_good_values() {
        let mut output = Vec::new();
        let err = run(
            &b"[1] {broken"[..],
            &mut output,
            Direction::Encode,
            &ConversionOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Format { .. }), "got {:?}", err);
        assert_eq!(output, to_vec(&Value::Array(vec![Value::Int(1)])).unwrap());
    }

    #[test]
    fn test_disabled_number_conversion() {
        let options = ConversionOptions::default().with_convert_numbers(false);
        let mut output = Vec::new();
        run(&b"3"[..], &mut output, Direction::Encode, &options).unwrap();
        assert_eq!(output, to_vec(&Value::Float(3.0)).unwrap());
    }
}
