//! Normalization of user-supplied RPC parameters.
//!
//! Parameters are given as JSON text, but a lone argument may be written
//! without the surrounding array, and a lone string argument without quotes:
//!
//! ```text
//! ""        -> []
//! "hello"   -> ["hello"]
//! "42"      -> [42]
//! "[1, 2]"  -> [1, 2]
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::codec::{Decoder, JsonDecoder};
use crate::error::{Error, Result};
use crate::options::ConversionOptions;
use crate::value::Value;

/// Matches text whose first character is a letter (general category L).
fn leading_letter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A\p{L}").expect("letter pattern compiles"))
}

/// Turn a raw parameter string into a JSON array literal.
pub fn adjust_params(params: &str) -> String {
    if params.is_empty() {
        return "[]".to_string();
    }
    if params.starts_with('[') {
        return params.to_string();
    }

    if leading_letter().is_match(params) {
        // Serializing a str cannot fail
        let quoted = serde_json::to_string(params).unwrap_or_default();
        format!("[{}]", quoted)
    } else {
        format!("[{}]", params)
    }
}

/// Decode an argument list literal into positional arguments.
///
/// # Errors
///
/// Returns a JSON decoding error for malformed JSON, and `Error::Argument`
/// if the literal is not exactly one JSON array.
pub fn decode_params(literal: &str, options: &ConversionOptions) -> Result<Vec<Value>> {
    let mut decoder = JsonDecoder::new(literal.as_bytes(), options.convert_numbers);

    let value = decoder
        .decode()?
        .ok_or_else(|| Error::Argument("RPC parameters are empty".to_string()))?;
    if decoder.decode()?.is_some() {
        return Err(Error::Argument(
            "unexpected data after RPC parameters".to_string(),
        ));
    }

    match value {
        Value::Array(args) => Ok(args),
        other => Err(Error::Argument(format!(
            "RPC parameters must be a JSON array, got {}",
            other.kind()
        ))),
    }
}

/// [`adjust_params`] followed by [`decode_params`].
pub fn parse_params(params: &str, options: &ConversionOptions) -> Result<Vec<Value>> {
    decode_params(&adjust_params(params), options)
}
