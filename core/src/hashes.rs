//! Content hashes of the workspace, kept for fast-path eligibility checks.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use vigil_types::FileId;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash([u8; 32]);

impl StateHash {
    /// SHA-256 of arbitrary bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// SHA-256 over a sequence of parts, each terminated by a newline.
    #[must_use]
    pub fn of_lines<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash(")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "…)")
    }
}

/// Last known hash of every analysed file.
#[derive(Debug, Default, Clone)]
pub struct StateHashes {
    by_file: HashMap<FileId, StateHash>,
}

impl StateHashes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, file: FileId) -> Option<StateHash> {
        self.by_file.get(&file).copied()
    }

    pub fn insert(&mut self, file: FileId, hash: StateHash) {
        self.by_file.insert(file, hash);
    }

    /// Whether `file` was hashed before and still hashes to `hash`.
    #[must_use]
    pub fn matches(&self, file: FileId, hash: StateHash) -> bool {
        self.get(file) == Some(hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(StateHash::of(b"abc"), StateHash::of(b"abc"));
        assert_ne!(StateHash::of(b"abc"), StateHash::of(b"abd"));
    }

    #[test]
    fn test_of_lines_separates_parts() {
        assert_ne!(
            StateHash::of_lines(["ab", "c"]),
            StateHash::of_lines(["a", "bc"])
        );
        assert_eq!(StateHash::of_lines(["abc"]), StateHash::of(b"abc\n"));
    }

    #[test]
    fn test_matches_requires_prior_entry() {
        let mut hashes = StateHashes::new();
        let h = StateHash::of(b"x");
        assert!(!hashes.matches(FileId::new(0), h));
        hashes.insert(FileId::new(0), h);
        assert!(hashes.matches(FileId::new(0), h));
        assert!(!hashes.matches(FileId::new(0), StateHash::of(b"y")));
    }
}
