//! `_VBA_PROJECT` stream header.
//!
//! The stream is a 7-byte header followed by the implementation-defined
//! performance cache, which is not interpreted beyond diagnostic display.

use bytes::Bytes;

use crate::common::binary::ByteCursor;
use crate::common::error::{Error, Result};

/// Fixed value of the first reserved field.
const STREAM_SIGNATURE: u16 = 0x61CC;

/// Parsed `_VBA_PROJECT` stream.
#[derive(Debug, Clone)]
pub struct ProjectStream {
    /// VBA implementation version that wrote the performance cache.
    pub version: u16,
    /// Opaque compiled-state bytes after the header.
    pub performance_cache: Bytes,
}

impl ProjectStream {
    pub fn parse(data: &Bytes) -> Result<Self> {
        let mut cur = ByteCursor::new(data);
        let signature = cur.read_u16()?;
        if signature != STREAM_SIGNATURE {
            return Err(Error::InvalidFormat(format!(
                "_VBA_PROJECT signature 0x{signature:04X}, expected 0x{STREAM_SIGNATURE:04X}"
            )));
        }
        let version = cur.read_u16()?;
        cur.skip(3)?; // reserved byte + reserved u16
        let cache = data.slice(cur.position()..);
        Ok(Self {
            version,
            performance_cache: cache,
        })
    }

    /// Render the performance cache as a classic 16-bytes-per-line hex
    /// dump with an ASCII gutter.
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.performance_cache.chunks(16).enumerate() {
            out.push_str(&format!("{:08X}  ", row * 16));
            for col in 0..16 {
                match chunk.get(col) {
                    Some(b) => out.push_str(&format!("{b:02X} ")),
                    None => out.push_str("   "),
                }
            }
            out.push(' ');
            for &b in chunk {
                out.push(if (0x20..0x7F).contains(&b) { b as char } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}
