//! Bounds-checked cursor over an in-memory byte slice.
//!
//! The compact container encodings (ziplist, listpack, zipmap, intset) arrive
//! as one length-prefixed string and are decoded from memory. Every read goes
//! through this cursor so a corrupt internal length turns into a clean
//! [`RdbError::Format`] instead of an out-of-bounds panic.

use crate::error::{RdbError, RdbResult};

/// Reads scalar values from a slice, front to back.
#[derive(Debug)]
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Offset of the next byte to be read.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn truncated(&self, wanted: usize) -> RdbError {
        RdbError::format(format!(
            "container truncated: needed {wanted} more bytes, {} available",
            self.remaining()
        ))
    }

    pub(crate) fn peek_u8(&self) -> RdbResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.truncated(1))
    }

    pub(crate) fn read_u8(&mut self) -> RdbResult<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> RdbResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> RdbResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub(crate) fn read_u16_le(&mut self) -> RdbResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> RdbResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u32_be(&mut self) -> RdbResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u64_le(&mut self) -> RdbResult<u64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub(crate) fn read_u64_be(&mut self) -> RdbResult<u64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    pub(crate) fn read_i16_le(&mut self) -> RdbResult<i16> {
        self.read_u16_le().map(|v| v as i16)
    }

    pub(crate) fn read_i32_le(&mut self) -> RdbResult<i32> {
        self.read_u32_le().map(|v| v as i32)
    }

    pub(crate) fn read_i64_le(&mut self) -> RdbResult<i64> {
        self.read_u64_le().map(|v| v as i64)
    }

    /// Reads a 24-bit little-endian signed integer with sign extension.
    pub(crate) fn read_i24_le(&mut self) -> RdbResult<i32> {
        let bytes = self.read_bytes(3)?;
        let raw = u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16);
        Ok(((raw << 8) as i32) >> 8)
    }
}
