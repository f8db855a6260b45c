//! Reinforcement - Randomized bitwise credit assignment
//!
//! Reinforcement pushes one output word toward a desired value. Every weight
//! row whose recomputed vote disagrees with the desired bit is corrected one
//! input word at a time:
//!
//! 1. **Eligible positions**: the bits whose flip moves the vote toward the
//!    desired bit. To raise a vote to 1 the row must disagree more, so the
//!    eligible bits are the ones where input and weight agree; to lower it
//!    to 0 they are the ones where they disagree.
//! 2. **Random subset**: eligible bits are masked with one random word, so a
//!    single wrong bit nudges the synapse rather than snapping it.
//! 3. **Blame split**: if the input word came from a leaf, the weight takes
//!    the whole correction. Otherwise a second random word splits the subset:
//!    set bits flip the weight, clear bits become a desired change to the
//!    upstream value, which the caller reinforces recursively.
//!
//! A bit position is never blamed on both the synapse and the upstream value.
//! The network variants (`graph`, `recurrent`) differ only in how they find
//! the recorded input and where the recursion goes.

use std::ops::AddAssign;

use rand::RngCore;

use crate::layer::Layer;
use crate::word::{bit, BitWord};

/// What a reinforcement call changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReinforceReport {
    /// Weight rows whose vote disagreed with the desired bit
    pub rows_corrected: usize,
    /// Weight bits flipped
    pub weight_bits_flipped: usize,
    /// Upstream reinforcement calls issued
    pub recursions: usize,
    /// Deepest recursion level reached (0 = the target itself)
    pub max_depth: usize,
}

impl ReinforceReport {
    /// True when no weight changed and nothing was propagated
    pub fn is_noop(&self) -> bool {
        self.rows_corrected == 0 && self.weight_bits_flipped == 0 && self.recursions == 0
    }

    pub(crate) fn reached(&mut self, level: usize) {
        self.max_depth = self.max_depth.max(level);
    }
}

impl AddAssign for ReinforceReport {
    fn add_assign(&mut self, rhs: Self) {
        self.rows_corrected += rhs.rows_corrected;
        self.weight_bits_flipped += rhs.weight_bits_flipped;
        self.recursions += rhs.recursions;
        self.max_depth = self.max_depth.max(rhs.max_depth);
    }
}

/// Row that needs correcting: its current vote and the vote wanted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mismatch {
    pub row: usize,
    pub emitted: BitWord,
}

/// Recompute row `row` and report it if it does not emit bit `bit_index` of `desired`
pub(crate) fn mismatch(
    layer: &Layer,
    row: usize,
    inputs: &[&[BitWord]],
    desired: BitWord,
    bit_index: usize,
) -> Option<Mismatch> {
    let emitted = layer.emitted_bit(row, inputs);
    (emitted != bit(desired, bit_index)).then_some(Mismatch { row, emitted })
}

/// Positions of `input` whose flip (in input or weight) moves the vote the right way
#[inline]
pub(crate) fn eligible(input: BitWord, weight: BitWord, emitted: BitWord) -> BitWord {
    let disagree = input ^ weight;
    if emitted == 0 {
        !disagree
    } else {
        disagree
    }
}

/// Correct input word `word` of a mismatched row
///
/// Draws the subset mask, then (for non-leaf inputs) the split mask, in that
/// order. Returns the desired upstream value when part of the correction is
/// blamed on the input.
pub(crate) fn correct_word<R: RngCore + ?Sized>(
    layer: &mut Layer,
    mismatch: Mismatch,
    word: usize,
    input: BitWord,
    leaf: bool,
    rng: &mut R,
    report: &mut ReinforceReport,
) -> Option<BitWord> {
    let weight = layer.weight(mismatch.row, word);
    let changemask = eligible(input, weight, mismatch.emitted) & rng.next_u64();
    if leaf {
        report.weight_bits_flipped += layer.flip(mismatch.row, word, changemask) as usize;
        return None;
    }
    let reinforcemask = rng.next_u64();
    report.weight_bits_flipped +=
        layer.flip(mismatch.row, word, reinforcemask & changemask) as usize;
    report.recursions += 1;
    Some(input ^ (changemask & !reinforcemask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{seeded, ReplayWords};
    use crate::word::agreement;

    #[test]
    fn test_eligible_moves_vote() {
        let input = 0x00FF_00FF_00FF_00FFu64;
        let weight = 0x0F0F_0F0F_0F0F_0F0Fu64;
        // raising a vote: flip agreeing bits to lower agreement
        let up = eligible(input, weight, 0);
        assert_eq!(agreement(input, weight ^ up), 0);
        // lowering a vote: flip disagreeing bits to raise agreement
        let down = eligible(input, weight, 1);
        assert_eq!(agreement(input, weight ^ down), 64);
    }

    #[test]
    fn test_leaf_correction_lands_on_weight() {
        let mut layer = Layer::from_weights(1, &[1], vec![vec![0]; 64]).unwrap();
        let mut rng = ReplayWords::constant(u64::MAX);
        let mut report = ReinforceReport::default();
        // all-ones input against zero weights emits 1; want 0
        let m = Mismatch { row: 0, emitted: 1 };
        let upstream = correct_word(&mut layer, m, 0, u64::MAX, true, &mut rng, &mut report);
        assert_eq!(upstream, None);
        assert_eq!(layer.row(0), Some(&[u64::MAX][..]));
        assert_eq!(report.weight_bits_flipped, 64);
        assert_eq!(rng.drawn(), 1);
    }

    #[test]
    fn test_split_never_blames_both() {
        let mut layer = Layer::from_weights(1, &[1], vec![vec![0]; 64]).unwrap();
        let split = 0xFFFF_FFFF_0000_0000u64;
        let mut rng = ReplayWords::new(vec![u64::MAX, split]);
        let mut report = ReinforceReport::default();
        let m = Mismatch { row: 3, emitted: 1 };
        let input = u64::MAX;
        let better = correct_word(&mut layer, m, 0, input, false, &mut rng, &mut report)
            .expect("non-leaf input propagates");
        let weight_change = layer.row(3).unwrap()[0];
        let input_change = input ^ better;
        assert_eq!(weight_change, split);
        assert_eq!(input_change, !split);
        assert_eq!(weight_change & input_change, 0);
        assert_eq!(report.recursions, 1);
        assert_eq!(rng.drawn(), 2);
    }

    #[test]
    fn test_mismatch_detects_wrong_rows() {
        let mut rng = seeded(4);
        let layer = Layer::new(2, &[1], &mut rng).unwrap();
        let input = [7u64, 9];
        let out = layer.compute_words(&[&input]).unwrap()[0];
        for row in 0..64 {
            assert!(mismatch(&layer, row, &[&input], out, row).is_none());
            assert!(mismatch(&layer, row, &[&input], !out, row).is_some());
        }
    }

    #[test]
    fn test_report_accumulates() {
        let mut total = ReinforceReport::default();
        assert!(total.is_noop());
        total += ReinforceReport {
            rows_corrected: 2,
            weight_bits_flipped: 10,
            recursions: 1,
            max_depth: 3,
        };
        total += ReinforceReport {
            rows_corrected: 1,
            weight_bits_flipped: 0,
            recursions: 0,
            max_depth: 1,
        };
        assert_eq!(total.rows_corrected, 3);
        assert_eq!(total.weight_bits_flipped, 10);
        assert_eq!(total.max_depth, 3);
        assert!(!total.is_noop());
    }
}
