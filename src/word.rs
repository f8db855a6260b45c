//! BitWord - The fundamental unit of state and synapse storage
//!
//! Everything that flows or is stored is a 64-bit word treated as a bit vector.
//! A weight row votes on one output bit: each input word is compared with the
//! matching weight word, and the bit fires when the row disagrees with its
//! input more than it agrees.
//!
//! # Example
//! ```
//! use bitvote::word::{agreement, score, vote};
//!
//! assert_eq!(agreement(0, 0), 64);
//! assert_eq!(agreement(0, u64::MAX), 0);
//!
//! // One input word against one weight word: 0 agreement -> score -32 -> fires
//! let s = score(&[0], [u64::MAX].iter());
//! assert_eq!(s, -32);
//! assert_eq!(vote(s), 1);
//! ```

/// A 64-bit value treated as a bit vector
pub type BitWord = u64;

/// Bits per word
pub const WORD_BITS: usize = 64;

/// Agreement of a single word pair at the voting threshold
const HALF: i32 = (WORD_BITS / 2) as i32;

/// Number of matching bit positions (64 − Hamming distance)
#[inline]
pub const fn agreement(a: BitWord, b: BitWord) -> u32 {
    WORD_BITS as u32 - (a ^ b).count_ones()
}

/// Aggregate agreement of a weight row against its input, centred on zero
///
/// `Σ agreement(x_j, w_j) − 32·n`. The input is consumed sequentially, so a
/// concatenation of several states can be passed as one flat iterator.
#[inline]
pub fn score<'a, I>(row: &[BitWord], input: I) -> i32
where
    I: IntoIterator<Item = &'a BitWord>,
{
    row.iter()
        .zip(input)
        .map(|(&w, &x)| agreement(x, w) as i32 - HALF)
        .sum()
}

/// Majority vote: 1 when the score is negative, 0 otherwise (zero included)
#[inline]
pub const fn vote(score: i32) -> BitWord {
    // sign bit of the accumulator
    ((score as i64 as u64) >> 63) & 1
}

/// Bit `i` of `word` as 0 or 1
#[inline]
pub const fn bit(word: BitWord, i: usize) -> BitWord {
    (word >> i) & 1
}

/// Low byte of a word (the observable readout)
#[inline]
pub const fn low_byte(word: BitWord) -> u8 {
    (word & 0xff) as u8
}

/// Replace the low byte of `word`, keeping every other bit
#[inline]
pub const fn with_low_byte(word: BitWord, byte: u8) -> BitWord {
    (word & !0xff) | byte as BitWord
}

/// Total word width of a sequence of word slices
pub fn total_width(parts: &[&[BitWord]]) -> usize {
    parts.iter().map(|p| p.len()).sum()
}
