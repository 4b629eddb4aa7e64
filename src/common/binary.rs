use crate::common::error::{Error, Result};
use zerocopy::{FromBytes, LE, U16, U32};

/// Read a little-endian u16 from a byte slice at the given offset.
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    if offset + 2 > data.len() {
        return Err(Error::MalformedRecord(format!(
            "need 2 bytes at offset {offset}, have {}",
            data.len().saturating_sub(offset)
        )));
    }
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| Error::MalformedRecord("failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(Error::MalformedRecord(format!(
            "need 4 bytes at offset {offset}, have {}",
            data.len().saturating_sub(offset)
        )));
    }
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| Error::MalformedRecord("failed to read u32".to_string()))
}

/// Forward-only cursor over a byte buffer.
///
/// Every tag/length/value walk in the crate goes through this type, so
/// truncated input from hostile files surfaces as a `MalformedRecord`
/// error instead of a panic or a silent out-of-bounds read.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Move the cursor back by `n` bytes, saturating at the start.
    ///
    /// Used after peeking a record tag that belongs to the next region.
    #[inline]
    pub fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    /// Jump to an absolute offset, clamped to the buffer length.
    #[inline]
    pub fn seek_to(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| {
            Error::MalformedRecord(format!("need 1 byte at offset {}", self.pos))
        })?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = read_u16_le(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = read_u32_le(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::MalformedRecord(format!(
                "need {n} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Advance past `n` bytes without borrowing them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Scan forward for the next occurrence of a little-endian u16 tag,
    /// starting at the current position. Returns its absolute offset.
    ///
    /// The scan is byte-aligned on purpose: a desynchronized cursor may sit
    /// at an odd offset relative to the record it is looking for.
    pub fn find_tag(&self, tag: u16) -> Option<usize> {
        let [lo, hi] = tag.to_le_bytes();
        let mut search_from = self.pos;
        while search_from + 1 < self.data.len() {
            let rel = memchr::memchr(lo, &self.data[search_from..self.data.len() - 1])?;
            let at = search_from + rel;
            if self.data[at + 1] == hi {
                return Some(at);
            }
            search_from = at + 1;
        }
        None
    }
}
