//! Unified error types for macrolens.
//!
//! The variants follow the containment policy used throughout the crate:
//! structural problems (no recognizable VBA layout) are represented as
//! absent results rather than errors, record-level problems are caught at
//! the dir-stream boundary, and per-module decode problems never abort a
//! multi-module scan.

use thiserror::Error;

/// Main error type for macrolens operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not a compound (CFB/OLE2) file
    #[error("Not a compound file")]
    NotCompoundFile,

    /// Input is neither a compound file nor a zip archive carrying a VBA project
    #[error("Not a recognizable Office container")]
    NotOfficeContainer,

    /// Compound file structures are internally inconsistent
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// A header or record did not have the expected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A dir-stream record sequence is truncated or runs past the buffer
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// MS-OVBA compressed container could not be decoded
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// The project code page has no known encoding
    #[error("Unsupported codepage: {0}")]
    UnsupportedCodepage(u16),

    /// A storage or stream expected to exist was not found
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// ZIP archive error while probing for an embedded VBA project
    #[error("ZIP error: {0}")]
    Zip(String),
}

/// Result type for macrolens operations.
pub type Result<T> = std::result::Result<T, Error>;
