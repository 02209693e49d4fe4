//! The workspace file table: dense `FileId → snapshot` storage.

use std::collections::HashMap;
use std::sync::Arc;

use vigil_types::FileId;

use crate::snapshot::SourceSnapshot;

/// Current snapshot of every file the workspace knows about.
///
/// Ids are handed out sequentially on first sight of a path and are never
/// reused or removed, so an id stays valid for the life of the process.
#[derive(Debug, Default)]
pub struct FileTable {
    files: Vec<Arc<SourceSnapshot>>,
    by_path: HashMap<String, FileId>,
}

impl FileTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn find(&self, path: &str) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    #[must_use]
    pub fn get(&self, id: FileId) -> Option<&Arc<SourceSnapshot>> {
        self.files.get(id.index())
    }

    /// Install `snapshot` as the current version of its path.
    ///
    /// Returns the existing id for a known path, or allocates the next one.
    pub fn upsert(&mut self, snapshot: SourceSnapshot) -> FileId {
        let snapshot = Arc::new(snapshot);
        if let Some(id) = self.find(snapshot.path()) {
            self.files[id.index()] = snapshot;
            return id;
        }
        let id = FileId::new(self.files.len() as u32);
        self.by_path.insert(snapshot.path().to_string(), id);
        self.files.push(snapshot);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &Arc<SourceSnapshot>)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, snap)| (FileId::new(idx as u32), snap))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Epoch;

    #[test]
    fn test_ids_are_sequential() {
        let mut table = FileTable::new();
        let a = table.upsert(SourceSnapshot::new("a.rb", "", Epoch::new(1)));
        let b = table.upsert(SourceSnapshot::new("b.rb", "", Epoch::new(1)));
        assert_eq!(a, FileId::new(0));
        assert_eq!(b, FileId::new(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_upsert_keeps_id_for_known_path() {
        let mut table = FileTable::new();
        let a = table.upsert(SourceSnapshot::new("a.rb", "v1", Epoch::new(1)));
        let again = table.upsert(SourceSnapshot::new("a.rb", "v2", Epoch::new(2)));
        assert_eq!(a, again);
        assert_eq!(table.get(a).unwrap().text(), "v2");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_upsert_does_not_touch_shared_snapshot() {
        let mut table = FileTable::new();
        let id = table.upsert(SourceSnapshot::new("a.rb", "v1", Epoch::new(1)));
        let held = Arc::clone(table.get(id).unwrap());
        table.upsert(SourceSnapshot::new("a.rb", "v2", Epoch::new(2)));
        assert_eq!(held.text(), "v1");
    }
}
