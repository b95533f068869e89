//! msgpack-cli library
//!
//! This library provides the core components of the `msgpack-cli` tool:
//!
//! - `value` - The generic value model shared by every codec
//! - `normalize` - Disambiguation of JSON number literals into integers or floats
//! - `codec` - JSON and MessagePack encoders/decoders over the value model
//! - `convert` - Streaming conversion between the two formats
//! - `rpc` - MessagePack-RPC client with a client-side deadline
//!
//! # Conversion
//!
//! ```ignore
//! use msgpack_cli::convert::{self, Direction};
//! use msgpack_cli::ConversionOptions;
//!
//! let options = ConversionOptions::default();
//! let input = std::io::BufReader::new(std::fs::File::open("data.json")?);
//! let written = convert::run(input, std::io::stdout(), Direction::Encode, &options)?;
//! ```
//!
//! # RPC
//!
//! ```ignore
//! use msgpack_cli::{rpc, ConversionOptions};
//!
//! let options = ConversionOptions::default();
//! let reply = rpc::call_and_render("localhost", 18800, "sum", "[1, 2]", &options).await?;
//! println!("{}", reply);
//! ```

pub mod codec;
pub mod convert;
pub mod error;
pub mod normalize;
pub mod options;
pub mod rpc;
pub mod value;

pub use error::{Error, Result, Stage};
pub use options::ConversionOptions;
pub use value::{Map, Value};
