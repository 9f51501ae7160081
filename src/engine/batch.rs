//! engine::batch
//!
//! A set of path changes committed together as one atomic unit.

use crate::core::types::{ContentPath, TypeError};

/// New content for a path, or its removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Write(Vec<u8>),
    Delete,
}

/// Path changes submitted together and committed as a single local commit.
///
/// Insertion order is kept (it is the order files are written in). A later
/// change to the same path replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    changes: Vec<(ContentPath, Change)>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the change for `path`, replacing any earlier one.
    pub fn insert(&mut self, path: ContentPath, change: Change) {
        match self.changes.iter_mut().find(|(p, _)| *p == path) {
            Some(slot) => slot.1 = change,
            None => self.changes.push((path, change)),
        }
    }

    /// Builder form of a content write.
    pub fn write(mut self, path: &str, content: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        self.insert(ContentPath::new(path)?, Change::Write(content.into()));
        Ok(self)
    }

    /// Builder form of a tombstone.
    pub fn delete(mut self, path: &str) -> Result<Self, TypeError> {
        self.insert(ContentPath::new(path)?, Change::Delete);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentPath, &Change)> {
        self.changes.iter().map(|(p, c)| (p, c))
    }

    pub fn paths(&self) -> impl Iterator<Item = &ContentPath> {
        self.changes.iter().map(|(p, _)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builder_keeps_insertion_order() {
        let batch = MutationBatch::new()
            .write("b.md", "b")
            .unwrap()
            .write("a.md", "a")
            .unwrap()
            .delete("c.md")
            .unwrap();

        let paths: Vec<_> = batch.paths().map(|p| p.as_str()).collect();
        assert_eq!(paths, ["b.md", "a.md", "c.md"]);
    }

    #[test]
    fn later_change_replaces_earlier() {
        let batch = MutationBatch::new()
            .write("a.md", "first")
            .unwrap()
            .write("b.md", "b")
            .unwrap()
            .delete("a.md")
            .unwrap();

        assert_eq!(batch.len(), 2);
        let (path, change) = batch.iter().next().unwrap();
        assert_eq!(path.as_str(), "a.md");
        assert_eq!(change, &Change::Delete);
    }

    #[test]
    fn invalid_path_rejected() {
        assert!(MutationBatch::new().write("../escape.md", "x").is_err());
        assert!(MutationBatch::new().delete(".git/config").is_err());
    }

    #[test]
    fn empty_batch() {
        let batch = MutationBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    proptest! {
        #[test]
        fn one_entry_per_path(names in proptest::collection::vec("[a-c]{1}\\.md", 0..20)) {
            let mut batch = MutationBatch::new();
            for name in &names {
                batch.insert(ContentPath::new(name).unwrap(), Change::Write(name.clone().into_bytes()));
            }
            let mut unique = names.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(batch.len(), unique.len());
        }
    }
}
