use crate::arena::Arena;
use crate::error::SolowordError;
use crate::prefix_key::{self, PrefixKey};
use crate::profile::ProfileWriter;

/// One occurrence of a word: inserts never search, so repeated words take
/// one slot per occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortItem {
    key: PrefixKey,
    occur: u64,
}

/// Sort-based in-core deduplicator.
///
/// `insert` is a plain append into the arena; all the work happens at
/// `pour`, which sorts the items by word and walks the runs. A run of
/// length one yields a `Unique` record carrying that occurrence's offset;
/// anything longer collapses to `Repeated`.
pub struct SortDedup {
    arena: Arena<SortItem>,
}

impl SortDedup {
    pub fn new(budget: usize, pinned: bool) -> Result<SortDedup, SolowordError> {
        Ok(SortDedup {
            arena: Arena::with_budget(budget, pinned)?,
        })
    }

    /// Returns false (leaving the dedup unchanged) when the working
    /// memory is full.
    pub fn insert(&mut self, word: &[u8], offset: u64) -> bool {
        debug_assert!(!word.is_empty());
        let (packed, tail) = prefix_key::decompose(word);
        match self.arena.alloc(tail) {
            Some((idx, pool_off)) => {
                self.arena.items_mut()[idx as usize] = SortItem {
                    key: PrefixKey::new(packed, pool_off),
                    occur: offset,
                };
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Drain into `out` in ascending word order and close it. Consumes the
    /// dedup; the working memory is gone afterwards.
    pub fn pour(self, mut out: ProfileWriter) -> Result<u64, SolowordError> {
        let (mut items, pool) = self.arena.into_parts();
        items.sort_unstable_by(|a, b| PrefixKey::order(&a.key, &b.key, &pool));

        let mut word = Vec::new();
        let mut i = 0;
        while i < items.len() {
            let mut j = i + 1;
            while j < items.len()
                && PrefixKey::order(&items[i].key, &items[j].key, &pool).is_eq()
            {
                j += 1;
            }
            items[i].key.write_word(&pool, &mut word);
            if j - i == 1 {
                out.push_word(&word, Some(items[i].occur))?;
            } else {
                out.push_word(&word, None)?;
            }
            i = j;
        }
        out.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ProfileItem, ProfileReader};

    fn pour_to_items(dedup: SortDedup) -> Vec<ProfileItem> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile");
        dedup.pour(ProfileWriter::create(&path).unwrap()).unwrap();
        let mut reader = ProfileReader::open(&path).unwrap();
        let mut items = Vec::new();
        while !reader.empty() {
            items.push(reader.pop().unwrap());
        }
        items
    }

    #[test]
    fn test_runs_collapse_to_repeated() {
        let mut dedup = SortDedup::new(1 << 16, false).unwrap();
        assert!(dedup.insert(b"cherry", 0));
        assert!(dedup.insert(b"apple", 7));
        assert!(dedup.insert(b"cherry", 13));
        assert!(dedup.insert(b"banana", 20));

        let items = pour_to_items(dedup);
        assert_eq!(
            items,
            vec![
                ProfileItem::Unique {
                    word: b"apple".to_vec(),
                    occur: 7
                },
                ProfileItem::Unique {
                    word: b"banana".to_vec(),
                    occur: 20
                },
                ProfileItem::Repeated {
                    word: b"cherry".to_vec()
                },
            ]
        );
    }

    #[test]
    fn test_long_words_survive_pool_roundtrip() {
        let mut dedup = SortDedup::new(1 << 16, false).unwrap();
        let long_a = b"prefix_matched_but_distinct_tail_a".as_slice();
        let long_b = b"prefix_matched_but_distinct_tail_b".as_slice();
        assert!(dedup.insert(long_b, 40));
        assert!(dedup.insert(long_a, 2));

        let items = pour_to_items(dedup);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].word(), long_a);
        assert_eq!(items[0].occur(), Some(2));
        assert_eq!(items[1].word(), long_b);
    }

    #[test]
    fn test_insert_reports_full() {
        // Room for only a couple of items.
        let mut dedup = SortDedup::new(48, false).unwrap();
        let mut inserted = 0;
        while dedup.insert(b"w", inserted) {
            inserted += 1;
        }
        assert!(inserted > 0);
        // Unchanged after the failed insert.
        assert_eq!(dedup.len() as u64, inserted);
    }

    #[test]
    fn test_empty_pour_produces_empty_profile() {
        let dedup = SortDedup::new(1 << 12, false).unwrap();
        assert!(pour_to_items(dedup).is_empty());
    }
}
