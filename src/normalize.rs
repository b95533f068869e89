//! Number literal normalization.
//!
//! JSON has a single number syntax while MessagePack distinguishes integers
//! from floats. The JSON decoder keeps number literals as text
//! ([`Value::Literal`]) and this pass rewrites each one into `Value::Int` or
//! `Value::Float` based on its spelling: a literal containing `.`, `e` or `E`
//! is a float, anything else is a 64-bit signed integer.

use crate::error::{Error, Result};
use crate::value::Value;

/// Numeric kind a literal is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Int,
    Float,
}

/// Decide the numeric kind of a literal from its text alone.
pub fn classify_literal(text: &str) -> NumberKind {
    if text.contains(|c| matches!(c, '.' | 'e' | 'E')) {
        NumberKind::Float
    } else {
        NumberKind::Int
    }
}

/// Parse a literal as the kind [`classify_literal`] picks for it.
///
/// # Errors
///
/// Returns `Error::NumberConversion` if the text is malformed or out of
/// range for the chosen kind.
pub fn parse_literal(text: &str) -> Result<Value> {
    match classify_literal(text) {
        NumberKind::Int => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| Error::number_conversion(text, e)),
        NumberKind::Float => parse_float(text).map(Value::Float),
    }
}

/// Parse a literal as a finite 64-bit float.
pub fn parse_float(text: &str) -> Result<f64> {
    let v: f64 = text
        .parse()
        .map_err(|e| Error::number_conversion(text, e))?;
    if !v.is_finite() {
        return Err(Error::number_conversion(text, "value out of range"));
    }
    Ok(v)
}

/// Rewrite every number literal in the tree, in place.
///
/// On error the tree may be partially rewritten and must be discarded.
pub fn normalize(value: &mut Value) -> Result<()> {
    match value {
        Value::Literal(text) => {
            let parsed = parse_literal(text)?;
            *value = parsed;
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize(item)?;
            }
        }
        Value::Map(map) => {
            for item in map.values_mut() {
                normalize(item)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {}
    }
    Ok(())
}
