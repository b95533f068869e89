//! Integration tests for file-based JSON <-> MessagePack conversion.
//!
//! # Running
//!
//! ```bash
//! cargo test --test conversion_integration
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use msgpack_cli::codec::{Decoder, MsgpackDecoder};
use msgpack_cli::convert::{self, Direction};
use msgpack_cli::{ConversionOptions, Error, Map, Value};

/// Per-test scratch directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("msgpack-cli-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

fn convert_file(
    input: &Path,
    output: &Path,
    direction: Direction,
    options: &ConversionOptions,
) -> Result<usize, Error> {
    let reader = BufReader::new(File::open(input).expect("Missing input"));
    let writer = BufWriter::new(File::create(output).expect("Cannot create output"));
    convert::run(reader, writer, direction, options)
}

fn decode_all(bytes: &[u8]) -> Vec<Value> {
    let mut decoder = MsgpackDecoder::new(bytes);
    let mut values = Vec::new();
    while let Some(value) = decoder.decode().expect("Decoding failed") {
        values.push(value);
    }
    values
}

#[test]
fn test_encode_concatenated_json_file() {
    let dir = scratch_dir("encode");
    let input = dir.join("in.json");
    let output = dir.join("out.msgpack");
    fs::write(&input, "{\"id\": 1, \"ratio\": 0.5}\n[\"a\", null, true]\n-3").unwrap();

    let count = convert_file(&input, &output, Direction::Encode, &ConversionOptions::default())
        .expect("Conversion failed");
    assert_eq!(count, 3);

    let mut record = Map::new();
    record.insert("id".to_string(), Value::Int(1));
    record.insert("ratio".to_string(), Value::Float(0.5));

    let values = decode_all(&fs::read(&output).unwrap());
    assert_eq!(
        values,
        vec![
            Value::Map(record),
            Value::Array(vec![Value::from("a"), Value::Null, Value::Bool(true)]),
            Value::Int(-3),
        ]
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_round_trip_through_files() {
    let dir = scratch_dir("round-trip");
    let source = dir.join("source.json");
    let packed = dir.join("packed.msgpack");
    let restored = dir.join("restored.json");
    fs::write(
        &source,
        r#"{"name": "job", "steps": [1, 2.25, -1e3], "meta": {"ok": false, "tag": null}}"#,
    )
    .unwrap();

    let options = ConversionOptions::default();
    convert_file(&source, &packed, Direction::Encode, &options).unwrap();
    convert_file(&packed, &restored, Direction::Decode, &options).unwrap();

    assert_eq!(
        fs::read_to_string(&restored).unwrap(),
        "{\"meta\":{\"ok\":false,\"tag\":null},\"name\":\"job\",\"steps\":[1,2.25,-1000.0]}\n"
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_deeply_nested_round_trip() {
    let dir = scratch_dir("nested");
    let source = dir.join("nested.json");
    let packed = dir.join("nested.msgpack");

    let depth = 50;
    let mut text = String::new();
    for _ in 0..depth {
        text.push_str("{\"k\": [");
    }
    text.push_str("123456789012");
    for _ in 0..depth {
        text.push_str("]}");
    }
    fs::write(&source, &text).unwrap();

    convert_file(&source, &packed, Direction::Encode, &ConversionOptions::default()).unwrap();

    let mut expected = Value::Int(123_456_789_012);
    for _ in 0..depth {
        let mut map = Map::new();
        map.insert("k".to_string(), Value::Array(vec![expected]));
        expected = Value::Map(map);
    }
    assert_eq!(decode_all(&fs::read(&packed).unwrap()), vec![expected]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_nesting_past_128_levels_round_trips() {
    let dir = scratch_dir("deep");
    let source = dir.join("deep.json");
    let packed = dir.join("deep.msgpack");
    let restored = dir.join("restored.json");

    // 100 maps each holding an array: 200 levels
    let mut text = String::new();
    for _ in 0..100 {
        text.push_str("{\"k\":[");
    }
    text.push_str("1.5");
    for _ in 0..100 {
        text.push_str("]}");
    }
    fs::write(&source, &text).unwrap();

    let options = ConversionOptions::default();
    assert_eq!(convert_file(&source, &packed, Direction::Encode, &options).unwrap(), 1);
    assert_eq!(convert_file(&packed, &restored, Direction::Decode, &options).unwrap(), 1);

    assert_eq!(fs::read_to_string(&restored).unwrap(), format!("{}\n", text));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_pretty_printed_decode() {
    let dir = scratch_dir("pretty");
    let packed = dir.join("in.msgpack");
    let output = dir.join("out.json");

    let mut map = Map::new();
    map.insert("b".to_string(), Value::Array(vec![Value::Int(1)]));
    map.insert("a".to_string(), Value::from("x"));
    fs::write(&packed, rmp_serde::to_vec(&Value::Map(map)).unwrap()).unwrap();

    let options = ConversionOptions::default().with_indent(true);
    convert_file(&packed, &output, Direction::Decode, &options).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "{\n  \"a\": \"x\",\n  \"b\": [\n    1\n  ]\n}\n"
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_integer_overflow_aborts_encoding() {
    let dir = scratch_dir("overflow");
    let input = dir.join("in.json");
    let output = dir.join("out.msgpack");
    fs::write(&input, "[1, 99999999999999999999]").unwrap();

    let err = convert_file(&input, &output, Direction::Encode, &ConversionOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NumberConversion { .. }), "got {:?}", err);

    // Without integer classification the same literal is a float
    let options = ConversionOptions::default().with_convert_numbers(false);
    let count = convert_file(&input, &output, Direction::Encode, &options).unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        decode_all(&fs::read(&output).unwrap()),
        vec![Value::Array(vec![Value::Float(1.0), Value::Float(1e20)])]
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_truncated_msgpack_is_an_error() {
    let dir = scratch_dir("truncated");
    let packed = dir.join("in.msgpack");
    let output = dir.join("out.json");

    let mut bytes = rmp_serde::to_vec(&Value::from("complete")).unwrap();
    let second = rmp_serde::to_vec(&Value::from("cut short")).unwrap();
    bytes.extend_from_slice(&second[..second.len() - 2]);
    fs::write(&packed, bytes).unwrap();

    let err = convert_file(&packed, &output, Direction::Decode, &ConversionOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Format { .. } | Error::Io(_)), "got {:?}", err);

    fs::remove_dir_all(&dir).ok();
}
