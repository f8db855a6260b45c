//! Layer - Weight matrix with majority-vote forward computation
//!
//! A layer owns `64 × Σ output_pattern` weight rows, each `input_words` wide.
//! Row `i` votes on output bit `i`: bits are packed 64 at a time (low bit
//! first) into output words, and the words are cut into segments following
//! `output_pattern`.
//!
//! ```text
//! input  (concatenated)    [x0 x1 ... x(n-1)]
//! row i                    [w0 w1 ... w(n-1)]  -> bit i
//! output words             [ seg 0 | seg 1 | ... ]
//! ```

use rand::RngCore;

use crate::error::{BitvoteError, Result};
use crate::word::{score, total_width, vote, BitWord, WORD_BITS};

/// Stable index of a layer inside a network arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

impl LayerId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Binary weight matrix plus its input/output layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    /// Expected width of the concatenated input
    input_words: usize,
    /// Output segment widths, in words
    output_pattern: Vec<usize>,
    /// One row per output bit
    weights: Vec<Vec<BitWord>>,
}

impl Layer {
    /// Create a layer with uniformly random weights
    pub fn new<R: RngCore + ?Sized>(
        input_words: usize,
        output_pattern: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        let rows = validate_layout(input_words, output_pattern)?;
        let mut layer = Self {
            input_words,
            output_pattern: output_pattern.to_vec(),
            weights: vec![vec![0; input_words]; rows],
        };
        layer.randomize_weights(rng);
        Ok(layer)
    }

    /// Create a layer from an explicit weight matrix
    pub fn from_weights(
        input_words: usize,
        output_pattern: &[usize],
        weights: Vec<Vec<BitWord>>,
    ) -> Result<Self> {
        let rows = validate_layout(input_words, output_pattern)?;
        if weights.len() != rows {
            return Err(BitvoteError::shape("weight row count", rows, weights.len()));
        }
        if let Some(row) = weights.iter().find(|row| row.len() != input_words) {
            return Err(BitvoteError::shape("weight row width", input_words, row.len()));
        }
        Ok(Self {
            input_words,
            output_pattern: output_pattern.to_vec(),
            weights,
        })
    }

    /// Fill every weight word with an independent uniform draw
    pub fn randomize_weights<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        for row in &mut self.weights {
            for w in row.iter_mut() {
                *w = rng.next_u64();
            }
        }
    }

    pub fn input_words(&self) -> usize {
        self.input_words
    }

    pub fn output_pattern(&self) -> &[usize] {
        &self.output_pattern
    }

    /// Total output width in words
    pub fn output_words(&self) -> usize {
        self.output_pattern.iter().sum()
    }

    /// Number of weight rows (output bits)
    pub fn rows(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[Vec<BitWord>] {
        &self.weights
    }

    /// One weight row, or `None` past the last output bit
    pub fn row(&self, row: usize) -> Option<&[BitWord]> {
        self.weights.get(row).map(Vec::as_slice)
    }

    /// Overwrite one weight row
    pub fn set_row(&mut self, row: usize, words: &[BitWord]) -> Result<()> {
        let rows = self.rows();
        let target = self
            .weights
            .get_mut(row)
            .ok_or(BitvoteError::WordOutOfRange { index: row, width: rows })?;
        if words.len() != target.len() {
            return Err(BitvoteError::shape("weight row width", target.len(), words.len()));
        }
        target.copy_from_slice(words);
        Ok(())
    }

    /// Word offset and width of every output segment
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.output_pattern.iter().scan(0, |offset, &width| {
            let start = *offset;
            *offset += width;
            Some((start, width))
        })
    }

    /// Forward pass: packed output words for a concatenated input
    pub fn compute_words(&self, inputs: &[&[BitWord]]) -> Result<Vec<BitWord>> {
        self.check_input(inputs)?;
        let mut output = vec![0; self.output_words()];
        for (i, row) in self.weights.iter().enumerate() {
            let s = score(row, inputs.iter().flat_map(|part| part.iter()));
            output[i / WORD_BITS] |= vote(s) << (i % WORD_BITS);
        }
        Ok(output)
    }

    /// Forward pass split into output segments
    pub fn compute_segments(&self, inputs: &[&[BitWord]]) -> Result<Vec<Vec<BitWord>>> {
        let words = self.compute_words(inputs)?;
        Ok(self
            .segments()
            .map(|(offset, width)| words[offset..offset + width].to_vec())
            .collect())
    }

    /// Reject inputs whose concatenated width differs from `input_words`
    pub fn check_input(&self, inputs: &[&[BitWord]]) -> Result<()> {
        let width = total_width(inputs);
        if width != self.input_words {
            return Err(BitvoteError::shape("layer input", self.input_words, width));
        }
        Ok(())
    }

    /// Recompute the bit row `row` emits for `inputs`
    pub(crate) fn emitted_bit(&self, row: usize, inputs: &[&[BitWord]]) -> BitWord {
        vote(score(
            &self.weights[row],
            inputs.iter().flat_map(|part| part.iter()),
        ))
    }

    #[inline]
    pub(crate) fn weight(&self, row: usize, word: usize) -> BitWord {
        self.weights[row][word]
    }

    /// Flip weight bits where `mask` is set, returning the number flipped
    #[inline]
    pub(crate) fn flip(&mut self, row: usize, word: usize, mask: BitWord) -> u32 {
        self.weights[row][word] ^= mask;
        mask.count_ones()
    }
}

/// Check a layout and return the row count it implies
fn validate_layout(input_words: usize, output_pattern: &[usize]) -> Result<usize> {
    if input_words == 0 {
        return Err(BitvoteError::DegenerateNetwork(
            "input width must be at least one word".into(),
        ));
    }
    if output_pattern.is_empty() {
        return Err(BitvoteError::DegenerateNetwork(
            "output pattern has no segments".into(),
        ));
    }
    if let Some(pos) = output_pattern.iter().position(|&w| w == 0) {
        return Err(BitvoteError::DegenerateNetwork(format!(
            "output segment {} has zero width",
            pos
        )));
    }
    Ok(WORD_BITS * output_pattern.iter().sum::<usize>())
}
