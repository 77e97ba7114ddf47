use crate::error::SolowordError;
use crate::profile::ProfileWriter;
use crate::sort_dedup::SortDedup;
use crate::tree_dedup::TreeDedup;

/// Which in-core deduplicator backs the profile stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKind {
    /// Append-then-sort: one slot per occurrence, no search on insert.
    Sort,
    /// Red-black tree: one slot per distinct word. The production path.
    Tree,
}

/// The two deduplicators behind one insert/pour contract, so the profile
/// stage never cares which one it is driving.
pub enum InCoreDedup {
    Sort(SortDedup),
    Tree(TreeDedup),
}

impl InCoreDedup {
    pub fn new(kind: DedupKind, budget: usize, pinned: bool) -> Result<InCoreDedup, SolowordError> {
        Ok(match kind {
            DedupKind::Sort => InCoreDedup::Sort(SortDedup::new(budget, pinned)?),
            DedupKind::Tree => InCoreDedup::Tree(TreeDedup::new(budget, pinned)?),
        })
    }

    /// Returns false when the working memory is full; the structure is
    /// unchanged in that case and the word must go into the next segment.
    pub fn insert(&mut self, word: &[u8], offset: u64) -> bool {
        match self {
            InCoreDedup::Sort(d) => d.insert(word, offset),
            InCoreDedup::Tree(d) => d.insert(word, offset),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            InCoreDedup::Sort(d) => d.is_empty(),
            InCoreDedup::Tree(d) => d.is_empty(),
        }
    }

    /// Emit the sorted, deduplicated profile and close the writer.
    pub fn pour(self, out: ProfileWriter) -> Result<u64, SolowordError> {
        match self {
            InCoreDedup::Sort(d) => d.pour(out),
            InCoreDedup::Tree(d) => d.pour(out),
        }
    }
}
