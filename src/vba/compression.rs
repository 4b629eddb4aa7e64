//! MS-OVBA compression container decoder (MS-OVBA §2.4.1).
//!
//! The dir stream and every module's source payload are wrapped in this
//! RLE-style format: a 0x01 signature byte followed by chunks of at most
//! 4096 decompressed bytes. Each chunk carries a 2-byte header (12-bit
//! size, 3-bit signature 0b011, compressed flag) and, when compressed, a
//! sequence of flag bytes interleaving literals with 2-byte copy tokens
//! whose offset/length bit split depends on how far into the chunk the
//! decoder currently is.

use crate::common::error::{Error, Result};

/// Decompressed chunk capacity.
const CHUNK_SIZE: usize = 4096;

/// Signature byte that opens every compressed container.
const CONTAINER_SIGNATURE: u8 = 0x01;

/// Decompress an MS-OVBA compressed container.
///
/// Malformed input (bad signature, truncated chunk, copy token reaching
/// before the chunk start) is an error, never silently truncated output.
pub fn decompress(container: &[u8]) -> Result<Vec<u8>> {
    if container.is_empty() {
        return Err(Error::Decompression("empty container".to_string()));
    }
    if container[0] != CONTAINER_SIGNATURE {
        return Err(Error::Decompression(format!(
            "bad container signature 0x{:02X}",
            container[0]
        )));
    }

    let mut out = Vec::new();
    let mut pos = 1;

    while pos < container.len() {
        if pos + 2 > container.len() {
            return Err(Error::Decompression("truncated chunk header".to_string()));
        }
        let header = u16::from_le_bytes([container[pos], container[pos + 1]]);
        // Total chunk size including the 2-byte header
        let chunk_size = (header & 0x0FFF) as usize + 3;
        let signature = (header >> 12) & 0x7;
        let compressed = header & 0x8000 != 0;

        if signature != 0b011 {
            return Err(Error::Decompression(format!(
                "bad chunk signature 0b{signature:03b} at offset {pos}"
            )));
        }

        let data_start = pos + 2;
        if compressed {
            let data_end = pos + chunk_size;
            if data_end > container.len() {
                return Err(Error::Decompression(format!(
                    "chunk at offset {pos} declares {chunk_size} bytes past end of container"
                )));
            }
            decompress_chunk(&container[data_start..data_end], &mut out)?;
            pos = data_end;
        } else {
            // Raw chunk: exactly 4096 literal bytes
            let data_end = data_start + CHUNK_SIZE;
            if data_end > container.len() {
                return Err(Error::Decompression("truncated raw chunk".to_string()));
            }
            out.extend_from_slice(&container[data_start..data_end]);
            pos = data_end;
        }
    }

    Ok(out)
}

/// Decode one compressed chunk's token sequences into `out`.
fn decompress_chunk(data: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let chunk_base = out.len();
    let mut i = 0;

    'chunk: while i < data.len() && out.len() - chunk_base < CHUNK_SIZE {
        let flags = data[i];
        i += 1;

        for bit in 0..8 {
            if i >= data.len() || out.len() - chunk_base >= CHUNK_SIZE {
                break 'chunk;
            }

            if flags & (1 << bit) == 0 {
                out.push(data[i]);
                i += 1;
            } else {
                if i + 2 > data.len() {
                    return Err(Error::Decompression("truncated copy token".to_string()));
                }
                let token = u16::from_le_bytes([data[i], data[i + 1]]);
                i += 2;

                let written = out.len() - chunk_base;
                let bits = offset_bit_count(written);
                let length_mask = 0xFFFFu16 >> bits;
                let length = (token & length_mask) as usize + 3;
                let offset = (token >> (16 - bits)) as usize + 1;

                if offset > written {
                    return Err(Error::Decompression(format!(
                        "copy token offset {offset} reaches before chunk start"
                    )));
                }
                // Overlapping copies are legal and must be done bytewise
                for _ in 0..length {
                    let byte = out[out.len() - offset];
                    out.push(byte);
                }
            }
        }
    }

    Ok(())
}

/// Number of offset bits in a copy token, given how many bytes of the
/// current chunk are already decompressed: max(ceil(log2(written)), 4),
/// capped at 12.
#[inline]
fn offset_bit_count(written: usize) -> u32 {
    let mut bits = 4;
    while (1usize << bits) < written && bits < 12 {
        bits += 1;
    }
    bits
}

/// Build a container of all-literal compressed chunks. Test fixture
/// counterpart of [`decompress`]; not a real compressor.
#[cfg(test)]
pub(crate) fn compress_literal(data: &[u8]) -> Vec<u8> {
    let mut container = vec![CONTAINER_SIGNATURE];
    if data.is_empty() {
        return container;
    }
    // Literal tokens cost one flag byte per 8 bytes, so full 4096-byte
    // chunks would overflow the 12-bit size field; keep chunks small.
    for chunk in data.chunks(3000) {
        let mut body = Vec::with_capacity(chunk.len() + chunk.len() / 8 + 1);
        for group in chunk.chunks(8) {
            body.push(0u8); // all literal tokens
            body.extend_from_slice(group);
        }
        let header = (body.len() as u16 - 1) | (0b011 << 12) | 0x8000;
        container.extend_from_slice(&header.to_le_bytes());
        container.extend_from_slice(&body);
    }
    container
}
