//! Fixed-width row bitset.
//!
//! A [`BitRows`] holds one bit per row packed LSB-first into [`BitBlock`]
//! words: row `r` lives in word `r / 64`, bit `r % 64`. The padding bits of the
//! final word are always zero, which is what lets split evaluation be a plain
//! word-wise AND followed by a population count.

use crate::core::constants::BITS_PER_BLOCK;
use crate::core::types::BitBlock;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of words needed to hold `len` bits.
pub fn blocks_required_for(len: usize) -> usize {
    (len + BITS_PER_BLOCK - 1) / BITS_PER_BLOCK
}

/// Number of unused padding bits in the final word for `len` bits.
pub fn discard_bits_for(len: usize) -> usize {
    blocks_required_for(len) * BITS_PER_BLOCK - len
}

/// Mask of the valid bits in the final word for `len` bits.
///
/// Returns all ones when `len` is a multiple of the word width (including 0).
pub fn last_word_mask(len: usize) -> BitBlock {
    match len % BITS_PER_BLOCK {
        0 => !0,
        r => ((1 as BitBlock) << r) - 1,
    }
}

/// One bit per row, packed into words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitRows {
    words: Vec<BitBlock>,
    len: usize,
}

impl BitRows {
    /// All-zero bitset of `len` rows.
    pub fn zeros(len: usize) -> Self {
        BitRows {
            words: vec![0; blocks_required_for(len)],
            len,
        }
    }

    /// All-one bitset of `len` rows; padding bits stay zero.
    pub fn ones(len: usize) -> Self {
        let mut words = vec![!0; blocks_required_for(len)];
        if let Some(last) = words.last_mut() {
            *last &= last_word_mask(len);
        }
        BitRows { words, len }
    }

    /// Build from one bool per row.
    pub fn from_bools<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut words = Vec::new();
        let mut len = 0;
        for bit in bits {
            if len % BITS_PER_BLOCK == 0 {
                words.push(0);
            }
            if bit {
                words[len / BITS_PER_BLOCK] |= (1 as BitBlock) << (len % BITS_PER_BLOCK);
            }
            len += 1;
        }
        BitRows { words, len }
    }

    /// Wrap raw words; padding bits are cleared.
    pub fn from_words(mut words: Vec<BitBlock>, len: usize) -> Option<Self> {
        if words.len() != blocks_required_for(len) {
            return None;
        }
        if let Some(last) = words.last_mut() {
            *last &= last_word_mask(len);
        }
        Some(BitRows { words, len })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bitset has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of words.
    pub fn num_blocks(&self) -> usize {
        self.words.len()
    }

    /// Number of padding bits in the final word.
    pub fn discard_bits(&self) -> usize {
        discard_bits_for(self.len)
    }

    /// Raw words.
    pub fn words(&self) -> &[BitBlock] {
        &self.words
    }

    /// Bit of row `row`.
    #[inline]
    pub fn get(&self, row: usize) -> bool {
        debug_assert!(row < self.len);
        (self.words[row / BITS_PER_BLOCK] >> (row % BITS_PER_BLOCK)) & 1 == 1
    }

    /// Set the bit of row `row`.
    #[inline]
    pub fn set(&mut self, row: usize, value: bool) {
        debug_assert!(row < self.len);
        let word = &mut self.words[row / BITS_PER_BLOCK];
        let bit: BitBlock = 1 << (row % BITS_PER_BLOCK);
        if value {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// `self & other`.
    pub fn and(&self, other: &BitRows) -> BitRows {
        debug_assert_eq!(self.len, other.len);
        BitRows {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| a & b)
                .collect(),
            len: self.len,
        }
    }

    /// `self & !other`, with padding kept clear.
    pub fn and_not(&self, other: &BitRows) -> BitRows {
        debug_assert_eq!(self.len, other.len);
        let mut words: Vec<BitBlock> = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| a & !b)
            .collect();
        if let Some(last) = words.last_mut() {
            *last &= last_word_mask(self.len);
        }
        BitRows {
            words,
            len: self.len,
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Population count of `self & other` without materialising the AND.
    #[inline]
    pub fn count_and(&self, other: &BitRows) -> u64 {
        count_and_words(&self.words, &other.words)
    }

    /// Population count of `self & other` restricted to a word range.
    #[inline]
    pub fn count_and_in(&self, other: &BitRows, blocks: Range<usize>) -> u64 {
        count_and_words(&self.words[blocks.clone()], &other.words[blocks])
    }

    /// Whether no bit is set.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

#[inline]
fn count_and_words(a: &[BitBlock], b: &[BitBlock]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x & y).count_ones() as u64)
        .sum()
}
