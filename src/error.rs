use thiserror::Error;

/// Errors produced while parsing or patching a Mach-O file.
///
/// All structural errors abort the whole parse; a corrupt architecture
/// invalidates the file. `LibrariesNotFound` is the one exception raised
/// only after a complete pass, so it can list every miss at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A structural read or a declared size runs past the available bytes.
    #[error("file is truncated or too small for its declared layout")]
    FileTooSmall,

    /// The leading bytes match no known Mach-O or fat magic.
    #[error("unknown magic number {0:#010x}")]
    InvalidMagic(u32),

    /// The file, or an architecture embedded in it, is a 32-bit Mach object.
    #[error("32-bit Mach-O files are not supported")]
    Unsupported32Bit,

    /// One or more requested paths never matched a dylib command anywhere
    /// in the file. Keys are sorted.
    #[error("libraries not found: {}", .0.join(", "))]
    LibrariesNotFound(Vec<String>),

    /// A replacement path is longer than the path it replaces; patching
    /// never grows a load command.
    #[error("replacement `{new}` is longer than `{old}`")]
    ReplacementTooLong { old: String, new: String },
}

pub type Result<T> = std::result::Result<T, PatchError>;
