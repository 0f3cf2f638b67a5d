//! Bounds-checked reads and writes over a mutable byte buffer.
//!
//! Every multi-byte field in a Mach-O file is decoded through [`View`] with
//! an explicit offset, width and [`Endian`] context; a read that would run
//! past the end of the view is a structural error, never a panic.

use crate::error::{PatchError, Result};

/// Whether multi-byte fields must be byte-reversed after decoding.
///
/// Fields are always decoded little-endian first; a file whose magic came
/// back in the reversed variant (`MH_CIGAM_64`, `FAT_CIGAM`, ...) stores its
/// fields in the opposite order and gets `Swap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Keep,
    Swap,
}

impl Endian {
    pub fn u32(self, raw: u32) -> u32 {
        match self {
            Endian::Keep => raw,
            Endian::Swap => raw.swap_bytes(),
        }
    }

    pub fn u64(self, raw: u64) -> u64 {
        match self {
            Endian::Keep => raw,
            Endian::Swap => raw.swap_bytes(),
        }
    }

}

/// A contiguous, bounds-known region of mutable bytes.
pub struct View<'a> {
    bytes: &'a mut [u8],
}

impl<'a> View<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn span(&self, offset: usize, width: usize) -> Result<usize> {
        let end = offset.checked_add(width).ok_or(PatchError::FileTooSmall)?;
        if end > self.bytes.len() {
            return Err(PatchError::FileTooSmall);
        }
        Ok(end)
    }

    /// Borrows `len` bytes starting at `offset`.
    pub fn get(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = self.span(offset, len)?;
        Ok(&self.bytes[offset..end])
    }

    pub fn read_u32(&self, offset: usize, endian: Endian) -> Result<u32> {
        let b = self.get(offset, 4)?;
        Ok(endian.u32(u32::from_le_bytes([b[0], b[1], b[2], b[3]])))
    }

    pub fn read_i32(&self, offset: usize, endian: Endian) -> Result<i32> {
        Ok(self.read_u32(offset, endian)? as i32)
    }

    pub fn read_u64(&self, offset: usize, endian: Endian) -> Result<u64> {
        let b = self.get(offset, 8)?;
        Ok(endian.u64(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])))
    }

    /// Overwrites `len` bytes starting at `offset` with zeros.
    pub fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        let end = self.span(offset, len)?;
        self.bytes[offset..end].fill(0);
        Ok(())
    }

    /// Copies `src` into the view starting at `offset`.
    pub fn write(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        let end = self.span(offset, src.len())?;
        self.bytes[offset..end].copy_from_slice(src);
        Ok(())
    }
}
