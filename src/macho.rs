//! Mach-O structure layout: magic numbers, load-command tags, and the
//! fixed-size headers decoded field by field through [`View`].

use crate::error::{PatchError, Result};
use crate::view::{Endian, View};

pub const MH_MAGIC: u32 = 0xfeedface;
pub const MH_CIGAM: u32 = 0xcefaedfe;
pub const MH_MAGIC_64: u32 = 0xfeedfacf;
pub const MH_CIGAM_64: u32 = 0xcffaedfe;
pub const FAT_MAGIC: u32 = 0xcafebabe;
pub const FAT_CIGAM: u32 = 0xbebafeca;
pub const FAT_MAGIC_64: u32 = 0xcafebabf;
pub const FAT_CIGAM_64: u32 = 0xbfbafeca;

pub const LC_LOAD_DYLIB: u32 = 0x0c;
pub const LC_UUID: u32 = 0x1b;
pub const LC_CODE_SIGNATURE: u32 = 0x1d;
pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
pub const LC_LOAD_WEAK_DYLIB: u32 = 0x8000_0018;

pub const CPU_TYPE_X86_64: i32 = 0x0100_0007;
pub const CPU_TYPE_ARM64: i32 = 0x0100_000c;

/// 64-bit Mach object header.
#[derive(Debug, Clone, Copy)]
pub struct MachHeader64 {
    pub magic: u32,
    pub cpu_type: i32,
    pub cpu_sub_type: i32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
    pub reserved: u32,
}

impl MachHeader64 {
    pub const SIZE: usize = 32;

    /// Decodes the header at the start of `view`, deriving the byte order
    /// from the magic. 32-bit objects are rejected outright.
    pub fn parse(view: &View) -> Result<(Self, Endian)> {
        let magic = view.read_u32(0, Endian::Keep)?;
        let endian = match magic {
            MH_MAGIC_64 => Endian::Keep,
            MH_CIGAM_64 => Endian::Swap,
            MH_MAGIC | MH_CIGAM => return Err(PatchError::Unsupported32Bit),
            other => return Err(PatchError::InvalidMagic(other)),
        };
        let header = Self {
            magic,
            cpu_type: view.read_i32(4, endian)?,
            cpu_sub_type: view.read_i32(8, endian)?,
            filetype: view.read_u32(12, endian)?,
            ncmds: view.read_u32(16, endian)?,
            sizeofcmds: view.read_u32(20, endian)?,
            flags: view.read_u32(24, endian)?,
            reserved: view.read_u32(28, endian)?,
        };
        Ok((header, endian))
    }
}

/// Fat container header: magic plus the architecture count.
#[derive(Debug, Clone, Copy)]
pub struct FatHeader {
    pub magic: u32,
    pub nfat_arch: u32,
}

impl FatHeader {
    pub const SIZE: usize = 8;

    pub fn parse(view: &View, endian: Endian) -> Result<Self> {
        Ok(Self {
            magic: view.read_u32(0, Endian::Keep)?,
            nfat_arch: view.read_u32(4, endian)?,
        })
    }
}

/// One architecture-table entry, decoded from either the 20-byte 32-bit
/// layout or the 32-byte 64-bit layout into a common form.
#[derive(Debug, Clone, Copy)]
pub struct FatArch {
    pub cpu_type: i32,
    pub cpu_sub_type: i32,
    pub offset: u64,
    pub size: u64,
    pub align: u32,
}

impl FatArch {
    pub const SIZE_32: usize = 20;
    pub const SIZE_64: usize = 32;

    pub fn parse_32(view: &View, at: usize, endian: Endian) -> Result<Self> {
        Ok(Self {
            cpu_type: view.read_i32(at, endian)?,
            cpu_sub_type: view.read_i32(at + 4, endian)?,
            offset: u64::from(view.read_u32(at + 8, endian)?),
            size: u64::from(view.read_u32(at + 12, endian)?),
            align: view.read_u32(at + 16, endian)?,
        })
    }

    pub fn parse_64(view: &View, at: usize, endian: Endian) -> Result<Self> {
        Ok(Self {
            cpu_type: view.read_i32(at, endian)?,
            cpu_sub_type: view.read_i32(at + 4, endian)?,
            offset: view.read_u64(at + 8, endian)?,
            size: view.read_u64(at + 16, endian)?,
            align: view.read_u32(at + 24, endian)?,
        })
    }
}

/// The 8-byte prefix every load command starts with.
#[derive(Debug, Clone, Copy)]
pub struct LoadCommand {
    pub cmd: u32,
    pub cmdsize: u32,
}

impl LoadCommand {
    pub const SIZE: usize = 8;

    pub fn parse(view: &View, at: usize, endian: Endian) -> Result<Self> {
        Ok(Self {
            cmd: view.read_u32(at, endian)?,
            cmdsize: view.read_u32(at + 4, endian)?,
        })
    }
}

/// Human-readable cpu type, matching what the loader calls them.
pub fn cpu_type_name(cpu_type: i32) -> String {
    match cpu_type {
        CPU_TYPE_X86_64 => "x86_64".to_string(),
        CPU_TYPE_ARM64 => "arm64".to_string(),
        other => format!("{:#010x}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parse_handles_both_byte_orders() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MH_MAGIC_64.to_le_bytes());
        bytes.extend_from_slice(&CPU_TYPE_ARM64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 24]);
        let (header, endian) = MachHeader64::parse(&View::new(&mut bytes)).unwrap();
        assert_eq!(endian, Endian::Keep);
        assert_eq!(header.cpu_type, CPU_TYPE_ARM64);

        let mut swapped = Vec::new();
        swapped.extend_from_slice(&MH_MAGIC_64.to_be_bytes());
        swapped.extend_from_slice(&CPU_TYPE_ARM64.to_be_bytes());
        swapped.extend_from_slice(&[0u8; 24]);
        let (header, endian) = MachHeader64::parse(&View::new(&mut swapped)).unwrap();
        assert_eq!(endian, Endian::Swap);
        assert_eq!(header.cpu_type, CPU_TYPE_ARM64);
    }

    #[test]
    fn header_parse_rejects_32_bit_objects() {
        for magic in [MH_MAGIC, MH_CIGAM] {
            let mut bytes = vec![0u8; MachHeader64::SIZE];
            bytes[..4].copy_from_slice(&magic.to_le_bytes());
            assert_eq!(
                MachHeader64::parse(&View::new(&mut bytes)).unwrap_err(),
                PatchError::Unsupported32Bit
            );
        }
    }

    #[test]
    fn truncated_header_is_too_small() {
        let mut bytes = MH_MAGIC_64.to_le_bytes().to_vec();
        assert_eq!(
            MachHeader64::parse(&View::new(&mut bytes)).unwrap_err(),
            PatchError::FileTooSmall
        );
    }
}
