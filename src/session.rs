//! One patch pass over a whole file: enumerate architectures, walk each
//! one's load commands, then settle the cross-file accounting.

use std::collections::{BTreeMap, BTreeSet};

use crate::commands;
use crate::error::{PatchError, Result};
use crate::fat::{self, ContainerKind};
use crate::view::View;

/// The requested old-path → new-path substitutions.
///
/// Keys are unique and every new path is no longer than the old one it
/// replaces; both are enforced here so the patch engine can rely on them.
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    map: BTreeMap<String, String>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one substitution. Inserting the same old path again replaces the
    /// earlier entry.
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) -> Result<()> {
        let (old, new) = (old.into(), new.into());
        if new.len() > old.len() {
            return Err(PatchError::ReplacementTooLong { old, new });
        }
        self.map.insert(old, new);
        Ok(())
    }

    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut replacements = Self::new();
        for (old, new) in pairs {
            replacements.insert(old, new)?;
        }
        Ok(replacements)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Requested old paths, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Looks up the substitution for an exact old path, returning the
    /// stored (old, new) pair.
    pub fn lookup(&self, path: &str) -> Option<(&str, &str)> {
        self.map
            .get_key_value(path)
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }
}

/// Accumulator threaded through the walk of every architecture.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Old paths that matched and were rewritten at least once, anywhere in
    /// the file. A key matching in several architectures lands here once.
    pub applied: BTreeSet<String>,
    pub signature_seen: bool,
}

/// What one architecture's walk found, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchReport {
    pub cpu_type: i32,
    pub uuid: Option<[u8; 16]>,
}

/// Result of a successful patch pass.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub container: ContainerKind,
    pub archs: Vec<ArchReport>,
    /// Old paths that were rewritten, sorted.
    pub applied: Vec<String>,
    /// An `LC_CODE_SIGNATURE` command was seen; the signature no longer
    /// matches the patched bytes and must be regenerated externally.
    pub signature_invalidated: bool,
}

/// Patches `data` in place, rewriting every dylib path that matches a
/// requested replacement across every embedded architecture.
///
/// Fails without touching the accounting if the file is structurally
/// invalid; fails with [`PatchError::LibrariesNotFound`] after a complete
/// pass if any requested path never matched anywhere.
pub fn patch(data: &mut [u8], replacements: &Replacements) -> Result<PatchOutcome> {
    let container = fat::detect(&View::new(&mut *data))?;
    let ranges = fat::architectures(&View::new(&mut *data), container)?;

    let mut state = SessionState::default();
    let mut archs = Vec::with_capacity(ranges.len());
    for range in ranges {
        let mut view = View::new(&mut data[range]);
        archs.push(commands::walk(&mut view, replacements, &mut state)?);
    }

    let missing: Vec<String> = replacements
        .keys()
        .filter(|key| !state.applied.contains(*key))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(PatchError::LibrariesNotFound(missing));
    }

    Ok(PatchOutcome {
        container,
        archs,
        applied: state.applied.into_iter().collect(),
        signature_invalidated: state.signature_seen,
    })
}
