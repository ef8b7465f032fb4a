//! A growable bitfield with small-object optimization: the first 256-bit
//! block lives inline, so any array that never needs more than 256 bits
//! (the common case for per-entity active-component sets) never touches the
//! heap.

use super::block::{BitfieldBlock, BITS_PER_BLOCK};
use crate::bits::{self, WORD_BITS};

/// A growable sequence of [`BitfieldBlock`]s with the first block stored
/// inline.
///
/// Capacity in bits is always `256 * block_count()`, and `block_count()` is
/// always `>= 1`. Growth (via [`reserve`](Self::reserve) or
/// [`set_bit`](Self::set_bit)) never shrinks capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldArray {
    first: BitfieldBlock,
    /// Additional blocks beyond the first. Empty until the array grows past
    /// 256 bits; a single contiguous allocation for all of them.
    rest: Vec<BitfieldBlock>,
}

impl Default for BitfieldArray {
    fn default() -> Self {
        Self::new()
    }
}

impl BitfieldArray {
    /// A new array with one (inline) empty block: 256 bits of capacity, no
    /// heap allocation.
    pub fn new() -> Self {
        Self {
            first: BitfieldBlock::EMPTY,
            rest: Vec::new(),
        }
    }

    /// Number of blocks currently backing the array (`>= 1`).
    #[inline]
    pub fn block_count(&self) -> usize {
        1 + self.rest.len()
    }

    /// Capacity in bits: `256 * block_count()`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block_count() * BITS_PER_BLOCK
    }

    #[inline]
    fn block(&self, idx: usize) -> &BitfieldBlock {
        if idx == 0 {
            &self.first
        } else {
            &self.rest[idx - 1]
        }
    }

    #[inline]
    fn block_mut(&mut self, idx: usize) -> &mut BitfieldBlock {
        if idx == 0 {
            &mut self.first
        } else {
            &mut self.rest[idx - 1]
        }
    }

    /// Grow capacity to at least `min_bits`, promoting `block_count` to
    /// `ceil(max(min_bits, 1) / 256)`. A no-op if capacity already suffices.
    /// The heap buffer backing blocks `1..block_count` is reallocated as a
    /// single contiguous `Vec`; existing blocks are preserved and new blocks
    /// are zero-initialized.
    pub fn reserve(&mut self, min_bits: usize) {
        let target_blocks = (min_bits.max(1) + BITS_PER_BLOCK - 1) / BITS_PER_BLOCK;
        if target_blocks <= self.block_count() {
            return;
        }
        let new_rest_len = target_blocks - 1;
        tracing::trace!(
            from_blocks = self.block_count(),
            to_blocks = target_blocks,
            "BitfieldArray growing"
        );
        self.rest.resize(new_rest_len, BitfieldBlock::EMPTY);
    }

    /// Set bit `i`, growing the array if `i` is past current capacity.
    pub fn set_bit(&mut self, i: usize) {
        if i >= self.capacity() {
            self.reserve(i + 1);
        }
        let (block_idx, bit) = (i / BITS_PER_BLOCK, i % BITS_PER_BLOCK);
        self.block_mut(block_idx).set(bit);
    }

    /// Clear bit `i`. A no-op if `i` is past current capacity.
    pub fn clear_bit(&mut self, i: usize) {
        if i >= self.capacity() {
            return;
        }
        let (block_idx, bit) = (i / BITS_PER_BLOCK, i % BITS_PER_BLOCK);
        self.block_mut(block_idx).clear(bit);
    }

    /// Read bit `i`. Reads as `false` past current capacity.
    pub fn get_bit(&self, i: usize) -> bool {
        if i >= self.capacity() {
            return false;
        }
        let (block_idx, bit) = (i / BITS_PER_BLOCK, i % BITS_PER_BLOCK);
        self.block(block_idx).get(bit)
    }

    /// Clear every bit in every block, without shrinking capacity.
    pub fn clear_all(&mut self) {
        self.first.clear_all();
        for b in &mut self.rest {
            b.clear_all();
        }
    }

    /// Total number of set bits across all blocks.
    pub fn popcount(&self) -> u32 {
        self.first.popcount() + self.rest.iter().map(BitfieldBlock::popcount).sum::<u32>()
    }

    /// Lowest set-bit index across all blocks (block 0 preferred, then
    /// ascending word index within a block), or `-1` if empty.
    pub fn find_first_set(&self) -> i64 {
        let r = self.first.find_first_set();
        if r >= 0 {
            return r as i64;
        }
        for (i, b) in self.rest.iter().enumerate() {
            let r = b.find_first_set();
            if r >= 0 {
                return ((i + 1) * BITS_PER_BLOCK) as i64 + r as i64;
            }
        }
        -1
    }

    /// Lowest clear-bit index across all blocks, or `-1` if every allocated
    /// bit is set (a full block contributes no candidate).
    pub fn find_first_clear(&self) -> i64 {
        let r = self.first.find_first_clear();
        if r >= 0 {
            return r as i64;
        }
        for (i, b) in self.rest.iter().enumerate() {
            let r = b.find_first_clear();
            if r >= 0 {
                return ((i + 1) * BITS_PER_BLOCK) as i64 + r as i64;
            }
        }
        -1
    }

    #[inline]
    fn word_at(&self, word_idx: usize) -> u64 {
        let block_idx = word_idx / super::block::WORDS_PER_BLOCK;
        let word_in_block = word_idx % super::block::WORDS_PER_BLOCK;
        self.block(block_idx).words()[word_in_block]
    }

    #[inline]
    fn total_words(&self) -> usize {
        self.block_count() * super::block::WORDS_PER_BLOCK
    }

    /// Iterate set-bit indices in strictly ascending order. The iterator
    /// walks a per-word residual copy; it never mutates the array, and the
    /// array must not be mutated while iteration is in progress.
    pub fn iter_set_bits(&self) -> SetBits<'_> {
        let total_words = self.total_words();
        let residual = if total_words > 0 { self.word_at(0) } else { 0 };
        SetBits {
            array: self,
            cur_word: 0,
            total_words,
            residual,
        }
    }

    fn for_each_block_pair(
        &mut self,
        other: &BitfieldArray,
        mut f: impl FnMut(&mut BitfieldBlock, Option<&BitfieldBlock>),
    ) {
        for i in 0..self.block_count() {
            let other_block = if i < other.block_count() {
                Some(other.block(i))
            } else {
                None
            };
            f(self.block_mut(i), other_block);
        }
    }

    /// In-place OR. Grows `self` to match `other`'s capacity first, then
    /// ORs word-by-word (missing blocks on the shorter side read as zero,
    /// which is already true since growth zero-initializes).
    pub fn or_assign(&mut self, other: &BitfieldArray) {
        self.reserve(other.capacity());
        self.for_each_block_pair(other, |a, b| {
            if let Some(b) = b {
                for (aw, bw) in a.words_mut().iter_mut().zip(b.words().iter()) {
                    *aw |= *bw;
                }
            }
        });
    }

    /// In-place XOR, with the same growth behavior as [`or_assign`](Self::or_assign).
    pub fn xor_assign(&mut self, other: &BitfieldArray) {
        self.reserve(other.capacity());
        self.for_each_block_pair(other, |a, b| {
            if let Some(b) = b {
                for (aw, bw) in a.words_mut().iter_mut().zip(b.words().iter()) {
                    *aw ^= *bw;
                }
            }
        });
    }

    /// In-place AND. Keeps `self`'s size; any block of `self` beyond
    /// `other`'s block count is zeroed (missing `other` blocks read as
    /// zero).
    pub fn and_assign(&mut self, other: &BitfieldArray) {
        for i in 0..self.block_count() {
            if i < other.block_count() {
                let other_block = *other.block(i);
                let a = self.block_mut(i);
                for (aw, bw) in a.words_mut().iter_mut().zip(other_block.words().iter()) {
                    *aw &= *bw;
                }
            } else {
                self.block_mut(i).clear_all();
            }
        }
    }

    /// Pure-value AND: result's block count is `max(|a|, |b|)`; missing
    /// source blocks on either side read as zero.
    pub fn and(&self, other: &BitfieldArray) -> BitfieldArray {
        let mut out = self.clone();
        out.reserve(other.capacity());
        out.and_assign(other);
        out
    }

    /// Pure-value OR.
    pub fn or(&self, other: &BitfieldArray) -> BitfieldArray {
        let mut out = self.clone();
        out.or_assign(other);
        out
    }

    /// Pure-value XOR.
    pub fn xor(&self, other: &BitfieldArray) -> BitfieldArray {
        let mut out = self.clone();
        out.xor_assign(other);
        out
    }

    /// Pure-value NOT: a new array of the same size with every bit inverted.
    pub fn not(&self) -> BitfieldArray {
        let mut out = self.clone();
        for i in 0..out.block_count() {
            let b = out.block_mut(i);
            for w in b.words_mut().iter_mut() {
                *w = !*w;
            }
        }
        out
    }
}

impl std::ops::BitAndAssign<&BitfieldArray> for BitfieldArray {
    fn bitand_assign(&mut self, rhs: &BitfieldArray) {
        self.and_assign(rhs);
    }
}

impl std::ops::BitOrAssign<&BitfieldArray> for BitfieldArray {
    fn bitor_assign(&mut self, rhs: &BitfieldArray) {
        self.or_assign(rhs);
    }
}

impl std::ops::BitXorAssign<&BitfieldArray> for BitfieldArray {
    fn bitxor_assign(&mut self, rhs: &BitfieldArray) {
        self.xor_assign(rhs);
    }
}

impl std::ops::BitAnd for &BitfieldArray {
    type Output = BitfieldArray;
    fn bitand(self, rhs: &BitfieldArray) -> BitfieldArray {
        self.and(rhs)
    }
}

impl std::ops::BitOr for &BitfieldArray {
    type Output = BitfieldArray;
    fn bitor(self, rhs: &BitfieldArray) -> BitfieldArray {
        self.or(rhs)
    }
}

impl std::ops::BitXor for &BitfieldArray {
    type Output = BitfieldArray;
    fn bitxor(self, rhs: &BitfieldArray) -> BitfieldArray {
        self.xor(rhs)
    }
}

impl std::ops::Not for &BitfieldArray {
    type Output = BitfieldArray;
    fn not(self) -> BitfieldArray {
        BitfieldArray::not(self)
    }
}

/// Ascending set-bit index iterator produced by [`BitfieldArray::iter_set_bits`].
pub struct SetBits<'a> {
    array: &'a BitfieldArray,
    cur_word: usize,
    total_words: usize,
    residual: u64,
}

impl<'a> Iterator for SetBits<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(bit) = bits::pop_first_set_bit(&mut self.residual) {
                return Some(self.cur_word * WORD_BITS + bit as usize);
            }
            self.cur_word += 1;
            if self.cur_word >= self.total_words {
                return None;
            }
            self.residual = self.array.word_at(self.cur_word);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_bitfield_stays_inline() {
        let mut a = BitfieldArray::new();
        a.set_bit(0);
        a.set_bit(10);
        a.set_bit(100);
        a.set_bit(200);
        assert_eq!(a.popcount(), 4);
        assert_eq!(a.iter_set_bits().collect::<Vec<_>>(), vec![0, 10, 100, 200]);
        assert_eq!(a.capacity(), 256);
        assert!(a.rest.is_empty(), "no heap block should have been allocated");
    }

    #[test]
    fn cross_block_growth() {
        let mut a = BitfieldArray::new();
        a.set_bit(500);
        assert!(a.capacity() >= 512);
        assert_eq!(a.find_first_set(), 500);
        assert_eq!(a.rest.len(), 1);
    }

    #[test]
    fn reserve_never_shrinks_and_is_multiple_of_256() {
        let mut a = BitfieldArray::new();
        a.reserve(1000);
        let cap = a.capacity();
        assert_eq!(cap % 256, 0);
        a.reserve(10);
        assert_eq!(a.capacity(), cap, "reserve with smaller n must not shrink");
    }

    #[test]
    fn get_bit_past_capacity_is_false() {
        let a = BitfieldArray::new();
        assert!(!a.get_bit(10_000));
    }

    #[test]
    fn clear_bit_past_capacity_is_noop() {
        let mut a = BitfieldArray::new();
        a.clear_bit(10_000);
        assert_eq!(a.capacity(), 256);
    }

    #[test]
    fn enumeration_matches_reference_against_random_ops() {
        let mut a = BitfieldArray::new();
        let mut reference = std::collections::BTreeSet::new();
        let ops: &[(usize, bool)] = &[
            (3, true),
            (900, true),
            (3, false),
            (0, true),
            (255, true),
            (256, true),
            (900, false),
        ];
        for &(i, set) in ops {
            if set {
                a.set_bit(i);
                reference.insert(i);
            } else {
                a.clear_bit(i);
                reference.remove(&i);
            }
        }
        let got: Vec<usize> = a.iter_set_bits().collect();
        let expected: Vec<usize> = reference.into_iter().collect();
        assert_eq!(got, expected);
        assert_eq!(a.popcount() as usize, expected.len());
    }

    #[test]
    fn find_first_set_and_clear_semantics() {
        let mut a = BitfieldArray::new();
        assert_eq!(a.find_first_set(), -1);
        a.set_bit(5);
        a.set_bit(400);
        assert_eq!(a.find_first_set(), 5);

        let mut full = BitfieldArray::new();
        for i in 0..256 {
            full.set_bit(i);
        }
        assert_eq!(full.find_first_clear(), -1);
        full.clear_bit(42);
        assert_eq!(full.find_first_clear(), 42);
    }

    #[test]
    fn and_pads_missing_blocks_with_zero() {
        let mut a = BitfieldArray::new();
        a.set_bit(10);
        a.set_bit(300);
        let mut b = BitfieldArray::new();
        b.set_bit(10);

        let c = a.and(&b);
        assert!(c.get_bit(10));
        assert!(!c.get_bit(300));
        assert_eq!(c.block_count(), a.block_count().max(b.block_count()));
    }

    #[test]
    fn or_assign_grows_to_match_rhs() {
        let mut a = BitfieldArray::new();
        let mut b = BitfieldArray::new();
        b.set_bit(300);
        a.or_assign(&b);
        assert!(a.get_bit(300));
        assert_eq!(a.block_count(), b.block_count());
    }

    #[test]
    fn and_assign_keeps_self_size_and_zeroes_extra_blocks() {
        let mut a = BitfieldArray::new();
        a.set_bit(300);
        let original_blocks = a.block_count();
        let b = BitfieldArray::new(); // only 1 block, all zero
        a.and_assign(&b);
        assert_eq!(a.block_count(), original_blocks);
        assert!(!a.get_bit(300));
    }

    #[test]
    fn not_inverts_every_bit_within_capacity() {
        let mut a = BitfieldArray::new();
        a.set_bit(5);
        let inverted = a.not();
        for i in 0..a.capacity() {
            assert_eq!(inverted.get_bit(i), !a.get_bit(i));
        }
    }

    #[test]
    fn xor_matches_reference() {
        let mut a = BitfieldArray::new();
        a.set_bit(1);
        a.set_bit(2);
        let mut b = BitfieldArray::new();
        b.set_bit(2);
        b.set_bit(3);
        let c = a.xor(&b);
        assert!(c.get_bit(1));
        assert!(!c.get_bit(2));
        assert!(c.get_bit(3));
    }
}
