use crate::arena::NO_TAIL;
use std::cmp::Ordering;

/// Comparison key for a word: the first eight bytes packed big-endian
/// into one integer, plus the pool offset of the NUL-terminated remainder
/// (`NO_TAIL` when the word fits the packed part).
///
/// Packing MSB-first makes the integer comparison agree with byte-wise
/// lexicographic order, and zero-padding short words is sound because a
/// word never contains a NUL byte. Most comparisons therefore never touch
/// the pool at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixKey {
    packed: u64,
    tail: u32,
}

pub const PACKED_LEN: usize = 8;

/// Split a word into its packed prefix and the overflow tail (if any).
pub fn decompose(word: &[u8]) -> (u64, Option<&[u8]>) {
    let mut packed: u64 = 0;
    for n in 0..PACKED_LEN {
        let b = if n < word.len() { word[n] } else { 0 };
        packed = (packed << 8) | b as u64;
    }
    let tail = if word.len() > PACKED_LEN {
        Some(&word[PACKED_LEN..])
    } else {
        None
    };
    (packed, tail)
}

impl PrefixKey {
    pub fn new(packed: u64, tail: u32) -> PrefixKey {
        PrefixKey { packed, tail }
    }

    /// The tail bytes (without the NUL) this key stored in `pool`.
    pub fn tail_slice<'p>(&self, pool: &'p [u8]) -> Option<&'p [u8]> {
        if self.tail == NO_TAIL {
            return None;
        }
        let start = self.tail as usize;
        let end = start
            + pool[start..]
                .iter()
                .position(|&b| b == 0)
                .expect("pool tails are NUL-terminated");
        Some(&pool[start..end])
    }

    /// Total order of two stored keys, equal to byte-lexicographic order
    /// of the full words.
    pub fn order(a: &PrefixKey, b: &PrefixKey, pool: &[u8]) -> Ordering {
        match a.packed.cmp(&b.packed) {
            Ordering::Equal => cmp_tails(a.tail_slice(pool), b.tail_slice(pool)),
            other => other,
        }
    }

    /// Compare a not-yet-stored probe `(packed, tail)` against a stored key.
    pub fn order_probe(
        packed: u64,
        tail: Option<&[u8]>,
        key: &PrefixKey,
        pool: &[u8],
    ) -> Ordering {
        match packed.cmp(&key.packed) {
            Ordering::Equal => cmp_tails(tail, key.tail_slice(pool)),
            other => other,
        }
    }

    /// Append the reconstructed word to `out` (cleared first).
    pub fn write_word(&self, pool: &[u8], out: &mut Vec<u8>) {
        out.clear();
        let prefix = self.packed.to_be_bytes();
        let used = prefix.iter().position(|&b| b == 0).unwrap_or(PACKED_LEN);
        out.extend_from_slice(&prefix[..used]);
        if let Some(tail) = self.tail_slice(pool) {
            out.extend_from_slice(tail);
        }
    }
}

/// Absent tails sort before present ones: equal packed prefixes mean the
/// tailless word is a strict prefix of the other.
fn cmp_tails(a: Option<&[u8]>, b: Option<&[u8]>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
    }
}
