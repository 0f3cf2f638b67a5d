//! Load-command walking and in-place dylib path patching for one
//! architecture slice.

use std::ops::Range;

use crate::error::{PatchError, Result};
use crate::macho::{
    LoadCommand, MachHeader64, LC_CODE_SIGNATURE, LC_LAZY_LOAD_DYLIB, LC_LOAD_DYLIB,
    LC_LOAD_WEAK_DYLIB, LC_UUID,
};
use crate::session::{ArchReport, Replacements, SessionState};
use crate::view::{Endian, View};

/// Offset of the `name` field inside a dylib-family load command.
const DYLIB_NAME_FIELD: usize = 8;

/// Walks every load command of the 64-bit object in `view`, patching dylib
/// paths and recording UUID / code-signature sightings in `state`.
///
/// The command list is trusted only as far as it stays inside the region the
/// header declares: `cmdsize` must cover at least the command prefix, no
/// command may run past `sizeofcmds`, and the accumulated sizes must land
/// exactly on `sizeofcmds` after `ncmds` commands.
pub fn walk(
    view: &mut View,
    replacements: &Replacements,
    state: &mut SessionState,
) -> Result<ArchReport> {
    let (header, endian) = MachHeader64::parse(view)?;

    let sizeofcmds = header.sizeofcmds as usize;
    let region_end = MachHeader64::SIZE
        .checked_add(sizeofcmds)
        .ok_or(PatchError::FileTooSmall)?;
    if region_end > view.len() {
        return Err(PatchError::FileTooSmall);
    }

    let mut uuid = None;
    let mut offset = MachHeader64::SIZE;
    for _ in 0..header.ncmds {
        if offset + LoadCommand::SIZE > region_end {
            return Err(PatchError::FileTooSmall);
        }
        let command = LoadCommand::parse(view, offset, endian)?;
        let cmdsize = command.cmdsize as usize;
        if cmdsize < LoadCommand::SIZE {
            return Err(PatchError::FileTooSmall);
        }
        let end = offset.checked_add(cmdsize).ok_or(PatchError::FileTooSmall)?;
        if end > region_end {
            return Err(PatchError::FileTooSmall);
        }

        match command.cmd {
            LC_UUID => {
                if offset + LoadCommand::SIZE + 16 > end {
                    return Err(PatchError::FileTooSmall);
                }
                let mut id = [0u8; 16];
                id.copy_from_slice(view.get(offset + LoadCommand::SIZE, 16)?);
                uuid = Some(id);
            }
            LC_CODE_SIGNATURE => state.signature_seen = true,
            LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_LAZY_LOAD_DYLIB => {
                patch_dylib_path(view, offset..end, endian, replacements, state)?;
            }
            _ => {}
        }

        offset = end;
    }

    if offset - MachHeader64::SIZE != sizeofcmds {
        return Err(PatchError::FileTooSmall);
    }

    Ok(ArchReport {
        cpu_type: header.cpu_type,
        uuid,
    })
}

/// Extracts the path string embedded in one dylib command and, if it matches
/// a requested replacement, rewrites it in place.
///
/// The string runs from the command's `name` offset to its first zero byte.
/// A malformed command with no terminator is read up to the command's end,
/// never past it. On a match the whole old span is zeroed first, then the
/// replacement is written over it; the replacement never being longer than
/// the old path is what keeps the command's layout untouched.
fn patch_dylib_path(
    view: &mut View,
    command: Range<usize>,
    endian: Endian,
    replacements: &Replacements,
    state: &mut SessionState,
) -> Result<()> {
    if command.len() < DYLIB_NAME_FIELD + 4 {
        return Err(PatchError::FileTooSmall);
    }
    let name_offset = view.read_u32(command.start + DYLIB_NAME_FIELD, endian)? as usize;
    let path_start = command
        .start
        .checked_add(name_offset)
        .ok_or(PatchError::FileTooSmall)?;
    if path_start > command.end {
        return Err(PatchError::FileTooSmall);
    }

    let tail = view.get(path_start, command.end - path_start)?;
    let span = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    let path = &tail[..span];

    let Some((old, new)) = std::str::from_utf8(path)
        .ok()
        .and_then(|p| replacements.lookup(p))
    else {
        return Ok(());
    };
    if new.len() > span {
        // Construction of `Replacements` rules this out, but never write
        // past the old string's span.
        return Err(PatchError::ReplacementTooLong {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
    let (old, new) = (old.to_string(), new.to_string());

    view.zero(path_start, span)?;
    view.write(path_start, new.as_bytes())?;
    state.applied.insert(old);

    Ok(())
}
