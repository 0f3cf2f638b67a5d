//! Container detection and architecture enumeration.
//!
//! A file is either a single 64-bit Mach object or a fat container wrapping
//! several of them. Enumeration yields one byte range per embedded object;
//! every range is validated against the buffer before anything is parsed
//! inside it, and one bad architecture invalidates the whole file.

use std::ops::Range;

use crate::error::{PatchError, Result};
use crate::macho::{
    FatArch, FatHeader, FAT_CIGAM, FAT_CIGAM_64, FAT_MAGIC, FAT_MAGIC_64, MH_CIGAM, MH_CIGAM_64,
    MH_MAGIC, MH_MAGIC_64,
};
use crate::view::{Endian, View};

/// What the leading magic says the file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Plain64,
    Fat32,
    Fat64,
}

impl ContainerKind {
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Plain64 => "64-bit Mach-O",
            ContainerKind::Fat32 => "fat",
            ContainerKind::Fat64 => "fat 64",
        }
    }
}

/// Classifies the buffer from its first 4 bytes.
pub fn detect(view: &View) -> Result<ContainerKind> {
    match view.read_u32(0, Endian::Keep)? {
        MH_MAGIC_64 | MH_CIGAM_64 => Ok(ContainerKind::Plain64),
        MH_MAGIC | MH_CIGAM => Err(PatchError::Unsupported32Bit),
        FAT_MAGIC | FAT_CIGAM => Ok(ContainerKind::Fat32),
        FAT_MAGIC_64 | FAT_CIGAM_64 => Ok(ContainerKind::Fat64),
        other => Err(PatchError::InvalidMagic(other)),
    }
}

/// Yields the byte range of every embedded 64-bit Mach object, in table
/// order. A plain file is a single range covering the whole buffer.
pub fn architectures(view: &View, kind: ContainerKind) -> Result<Vec<Range<usize>>> {
    let entry_size = match kind {
        ContainerKind::Plain64 => return Ok(vec![0..view.len()]),
        ContainerKind::Fat32 => FatArch::SIZE_32,
        ContainerKind::Fat64 => FatArch::SIZE_64,
    };

    let endian = match view.read_u32(0, Endian::Keep)? {
        FAT_MAGIC | FAT_MAGIC_64 => Endian::Keep,
        _ => Endian::Swap,
    };
    let header = FatHeader::parse(view, endian)?;

    let count = header.nfat_arch as usize;
    let table_len = count
        .checked_mul(entry_size)
        .ok_or(PatchError::FileTooSmall)?;
    // The whole table must fit before any entry is trusted.
    view.get(FatHeader::SIZE, table_len)?;

    let mut ranges = Vec::with_capacity(count);
    for index in 0..count {
        let at = FatHeader::SIZE + index * entry_size;
        let arch = match kind {
            ContainerKind::Fat32 => FatArch::parse_32(view, at, endian)?,
            _ => FatArch::parse_64(view, at, endian)?,
        };

        let start = usize::try_from(arch.offset).map_err(|_| PatchError::FileTooSmall)?;
        let len = usize::try_from(arch.size).map_err(|_| PatchError::FileTooSmall)?;
        let end = start.checked_add(len).ok_or(PatchError::FileTooSmall)?;
        if end > view.len() {
            return Err(PatchError::FileTooSmall);
        }

        // Each embedded object must itself be 64-bit Mach.
        match view.read_u32(start, Endian::Keep)? {
            MH_MAGIC_64 | MH_CIGAM_64 => {}
            MH_MAGIC | MH_CIGAM => return Err(PatchError::Unsupported32Bit),
            other => return Err(PatchError::InvalidMagic(other)),
        }

        ranges.push(start..end);
    }

    Ok(ranges)
}
