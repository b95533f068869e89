//! Conversion and RPC options.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default RPC call deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options consumed by codecs and the RPC orchestrator.
///
/// Built once from the command line and passed by reference; never mutated
/// after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Classify JSON number literals as integers or floats. When disabled
    /// every JSON number decodes as a float.
    pub convert_numbers: bool,
    /// Pretty-print JSON output with two-space indentation.
    pub indent: bool,
    /// RPC call deadline in seconds. Always greater than zero.
    pub timeout_secs: u64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            convert_numbers: true,
            indent: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ConversionOptions {
    pub fn with_convert_numbers(mut self, convert_numbers: bool) -> Self {
        self.convert_numbers = convert_numbers;
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Set the RPC deadline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Argument` for a zero timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Result<Self> {
        if timeout_secs == 0 {
            return Err(Error::Argument("timeout must be greater than zero".to_string()));
        }
        self.timeout_secs = timeout_secs;
        Ok(self)
    }

    /// The RPC deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parse a timeout given in whole seconds.
///
/// Accepts unsigned integers in the 32-bit range, excluding zero.
pub fn parse_timeout(text: &str) -> Result<u64> {
    let secs: u32 = text
        .trim()
        .parse()
        .map_err(|e| Error::Argument(format!("invalid timeout {:?}: {}", text, e)))?;
    if secs == 0 {
        return Err(Error::Argument("timeout must be greater than zero".to_string()));
    }
    Ok(u64::from(secs))
}
