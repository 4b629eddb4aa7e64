//! Shared infrastructure used by every format layer.

/// Little-endian primitive reads and the forward-only record cursor.
pub mod binary;

/// Windows codepage and UTF-16LE decoding utilities.
pub mod codepage;

/// Unified error types.
pub mod error;

pub use error::{Error, Result};
