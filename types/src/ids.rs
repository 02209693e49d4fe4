use std::fmt;

/// Dense, sequentially allocated identifier of a file in the workspace table.
///
/// Identifiers are never reused: a file that disappears from disk keeps its id
/// so epoch bookkeeping keyed by it stays valid for the life of the process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Position of this file in a dense table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workspace-wide version number. Totally orders update/analysis cycles.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Epoch(u32);

impl Epoch {
    /// Sentinel for "never reported". Every real cycle is numbered above it.
    pub const NEVER: Self = Self(0);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The epoch that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_next_is_monotonic() {
        let e = Epoch::NEVER;
        assert!(e.next() > e);
        assert_eq!(e.next().next().value(), 2);
    }

    #[test]
    fn epoch_next_saturates() {
        let e = Epoch::new(u32::MAX);
        assert_eq!(e.next(), e);
    }

    #[test]
    fn file_id_index_matches_value() {
        let id = FileId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(serde_json::to_value(Epoch::new(3)).unwrap(), 3);
        assert_eq!(serde_json::to_value(FileId::new(9)).unwrap(), 9);
    }
}
