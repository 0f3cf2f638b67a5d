//! In-place rewriting of dynamic-library paths in Mach-O files.
//!
//! Takes a 64-bit Mach-O object or a fat container, walks every
//! architecture's load commands, and rewrites the paths of
//! `LC_LOAD_DYLIB`-family commands with replacements that are never longer
//! than the originals, so the file's layout and size stay untouched. A
//! code signature is not regenerated; its presence is only reported so the
//! caller can re-sign.
//!
//! ```no_run
//! use patch_dylib_rs::{patch, Replacements};
//!
//! # fn main() -> patch_dylib_rs::Result<()> {
//! let mut data = std::fs::read("app").unwrap();
//! let replacements = Replacements::from_pairs([(
//!     "/usr/lib/swift/libswiftNetwork.dylib",
//!     "@rpath/libswiftNetwork.dylib",
//! )])?;
//! let outcome = patch(&mut data, &replacements)?;
//! if outcome.signature_invalidated {
//!     // re-sign before shipping
//! }
//! std::fs::write("app", &data).unwrap();
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod error;
pub mod fat;
pub mod macho;
pub mod session;
pub mod view;

pub use error::{PatchError, Result};
pub use fat::ContainerKind;
pub use session::{patch, ArchReport, PatchOutcome, Replacements};
