//! Recurrent network - Fixed cyclic layer topology with double-buffered state
//!
//! Layers live in an arena and name their input source by index, so cycles
//! (including self-loops) need no back-pointers. A tick advances every layer
//! once in id order. Each layer reads its source as it stands at that moment:
//! a source earlier in the order has already produced this tick's value, a
//! source at or after the reader (itself included) still holds last tick's.
//!
//! ## Reading history during reinforcement
//!
//! ```text
//! tick T-1            tick T
//! A.last  B.last      A.state  B.state
//!    \______________>    \______>
//!  (A reads B.last)    (B reads A.state)
//! ```
//!
//! Following a source that sits at or after the reader crosses a tick
//! boundary. Before any crossing the recursion reads `state`; after one it
//! reads `last_state`. After two or more crossings the exact value is gone,
//! and the one-tick-stale `last_state` stands in for it. The depth budget is
//! what stops the recursion from going round the cycle forever.

use rand::RngCore;

use crate::error::{BitvoteError, Result};
use crate::layer::{Layer, LayerId};
use crate::reinforce::{correct_word, mismatch, ReinforceReport};
use crate::word::{BitWord, WORD_BITS};

/// Where a recurrent layer reads its input from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wiring {
    /// Another layer's live state (may be itself)
    Previous(LayerId),
    /// Words injected with `set_input`
    External,
}

/// Scheduler phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// All buffers zeroed, no tick taken since reset
    #[default]
    Idle,
    /// At least one tick taken
    Running,
}

#[derive(Clone, Debug)]
enum Source {
    Previous(LayerId),
    External {
        /// Written by `set_input`, consumed by the next tick
        staged: Vec<BitWord>,
        /// Consumed at the latest tick
        input: Vec<BitWord>,
        /// Consumed at the tick before
        last_input: Vec<BitWord>,
    },
}

#[derive(Clone, Debug)]
struct Cell {
    layer: Layer,
    source: Source,
    state: Vec<BitWord>,
    last_state: Vec<BitWord>,
}

impl Cell {
    fn clear(&mut self) {
        self.state.fill(0);
        self.last_state.fill(0);
        if let Source::External { staged, input, last_input } = &mut self.source {
            staged.fill(0);
            input.fill(0);
            last_input.fill(0);
        }
    }
}

/// Layer declaration collected by the builder
#[derive(Clone, Debug)]
struct LayerDecl {
    input_words: usize,
    output_pattern: Vec<usize>,
    wiring: Wiring,
}

/// Collects layer declarations; wiring may refer forward, so it is only
/// checked in `build`
#[derive(Clone, Debug, Default)]
pub struct RecurrentBuilder {
    decls: Vec<LayerDecl>,
}

impl RecurrentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a layer; ids are assigned in declaration order
    pub fn layer(&mut self, input_words: usize, output_pattern: &[usize], wiring: Wiring) -> LayerId {
        self.decls.push(LayerDecl {
            input_words,
            output_pattern: output_pattern.to_vec(),
            wiring,
        });
        LayerId(self.decls.len() - 1)
    }

    /// Validate wiring and allocate randomly initialised layers
    pub fn build<R: RngCore + ?Sized>(self, rng: &mut R) -> Result<RecurrentNetwork> {
        if self.decls.is_empty() {
            return Err(BitvoteError::DegenerateNetwork("no layers declared".into()));
        }
        let widths: Vec<usize> = self
            .decls
            .iter()
            .map(|d| d.output_pattern.iter().sum())
            .collect();

        let mut cells = Vec::with_capacity(self.decls.len());
        for (index, decl) in self.decls.into_iter().enumerate() {
            let layer = Layer::new(decl.input_words, &decl.output_pattern, rng)?;
            let source = match decl.wiring {
                Wiring::Previous(prev) => {
                    let width = *widths.get(prev.0).ok_or_else(|| {
                        BitvoteError::DegenerateNetwork(format!(
                            "layer {} reads from missing layer {}",
                            index, prev.0
                        ))
                    })?;
                    if width != decl.input_words {
                        return Err(BitvoteError::shape("recurrent wiring", decl.input_words, width));
                    }
                    Source::Previous(prev)
                }
                Wiring::External => Source::External {
                    staged: vec![0; decl.input_words],
                    input: vec![0; decl.input_words],
                    last_input: vec![0; decl.input_words],
                },
            };
            let width = widths[index];
            cells.push(Cell {
                layer,
                source,
                state: vec![0; width],
                last_state: vec![0; width],
            });
        }
        log::debug!("built recurrent network with {} layers", cells.len());
        Ok(RecurrentNetwork {
            cells,
            phase: Phase::Idle,
            tick: 0,
        })
    }
}

/// Fixed set of layers wired into a (possibly cyclic) graph, advanced by ticks
#[derive(Clone, Debug)]
pub struct RecurrentNetwork {
    cells: Vec<Cell>,
    phase: Phase,
    tick: u64,
}

impl RecurrentNetwork {
    pub fn builder() -> RecurrentBuilder {
        RecurrentBuilder::new()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ticks taken since the last reset
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn cell(&self, id: LayerId) -> Result<&Cell> {
        self.cells.get(id.0).ok_or(BitvoteError::UnknownLayer(id.0))
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        Ok(&self.cell(id)?.layer)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.cells
            .get_mut(id.0)
            .map(|c| &mut c.layer)
            .ok_or(BitvoteError::UnknownLayer(id.0))
    }

    pub fn wiring(&self, id: LayerId) -> Result<Wiring> {
        Ok(match self.cell(id)?.source {
            Source::Previous(prev) => Wiring::Previous(prev),
            Source::External { .. } => Wiring::External,
        })
    }

    /// Live state of a layer (all segments concatenated)
    pub fn state(&self, id: LayerId) -> Result<&[BitWord]> {
        Ok(&self.cell(id)?.state)
    }

    /// State before the latest tick
    pub fn last_state(&self, id: LayerId) -> Result<&[BitWord]> {
        Ok(&self.cell(id)?.last_state)
    }

    /// One output segment of a layer's live state
    pub fn segment(&self, id: LayerId, segment: usize) -> Result<&[BitWord]> {
        let cell = self.cell(id)?;
        let (offset, width) = cell
            .layer
            .segments()
            .nth(segment)
            .ok_or(BitvoteError::WordOutOfRange {
                index: segment,
                width: cell.layer.output_pattern().len(),
            })?;
        Ok(&cell.state[offset..offset + width])
    }

    /// Stage input words for an externally fed layer; consumed by the next tick
    pub fn set_input(&mut self, id: LayerId, words: &[BitWord]) -> Result<()> {
        let cell = self.cells.get_mut(id.0).ok_or(BitvoteError::UnknownLayer(id.0))?;
        match &mut cell.source {
            Source::External { staged, .. } => {
                if staged.len() != words.len() {
                    return Err(BitvoteError::shape("external input", staged.len(), words.len()));
                }
                staged.copy_from_slice(words);
                Ok(())
            }
            Source::Previous(_) => Err(BitvoteError::NotExternal(id.0)),
        }
    }

    /// Zero every buffer and return to `Idle`
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.phase = Phase::Idle;
        self.tick = 0;
    }

    /// Re-draw every weight
    pub fn randomize_weights<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        for cell in &mut self.cells {
            cell.layer.randomize_weights(rng);
        }
    }

    /// One tick: every layer, in id order, recomputes from its source
    pub fn advance(&mut self) -> Result<()> {
        for index in 0..self.cells.len() {
            let words = {
                let cell = &self.cells[index];
                let input: &[BitWord] = match &cell.source {
                    Source::Previous(prev) => self.cells[prev.0].state.as_slice(),
                    Source::External { staged, .. } => staged.as_slice(),
                };
                cell.layer.compute_words(&[input])?
            };
            let cell = &mut self.cells[index];
            std::mem::swap(&mut cell.state, &mut cell.last_state);
            cell.state.copy_from_slice(&words);
            if let Source::External { staged, input, last_input } = &mut cell.source {
                std::mem::swap(input, last_input);
                input.copy_from_slice(staged);
            }
        }
        self.tick += 1;
        self.phase = Phase::Running;
        Ok(())
    }

    /// Push word `word` of layer `id`'s live state toward `desired`
    ///
    /// `depth` bounds how many layers the correction may travel through,
    /// the target included; zero is a no-op.
    pub fn reinforce<R: RngCore + ?Sized>(
        &mut self,
        id: LayerId,
        word: usize,
        desired: BitWord,
        depth: usize,
        rng: &mut R,
    ) -> Result<ReinforceReport> {
        let width = self.cell(id)?.state.len();
        if word >= width {
            return Err(BitvoteError::WordOutOfRange { index: word, width });
        }
        let mut report = ReinforceReport::default();
        self.reinforce_word(id.0, word, desired, depth, 0, 0, rng, &mut report);
        Ok(report)
    }

    /// Reinforce one output segment, word by word
    pub fn reinforce_segment<R: RngCore + ?Sized>(
        &mut self,
        id: LayerId,
        segment: usize,
        desired: &[BitWord],
        depth: usize,
        rng: &mut R,
    ) -> Result<ReinforceReport> {
        let (offset, width) = {
            let layer = self.layer(id)?;
            layer.segments().nth(segment).ok_or(BitvoteError::WordOutOfRange {
                index: segment,
                width: layer.output_pattern().len(),
            })?
        };
        if desired.len() != width {
            return Err(BitvoteError::shape("desired segment", width, desired.len()));
        }
        let mut report = ReinforceReport::default();
        for (i, &value) in desired.iter().enumerate() {
            report += self.reinforce(id, offset + i, value, depth, rng)?;
        }
        Ok(report)
    }

    /// The input layer `index` consumed for the value being explained, and
    /// whether it is a leaf. `crossings` counts tick boundaries crossed so far.
    fn recorded_input(&self, index: usize, crossings: usize) -> (Vec<BitWord>, usize, Option<usize>) {
        match &self.cells[index].source {
            Source::External { input, last_input, .. } => {
                let view = if crossings == 0 { input } else { last_input };
                (view.clone(), crossings, None)
            }
            Source::Previous(prev) => {
                let crossings = crossings + usize::from(prev.0 >= index);
                let source = &self.cells[prev.0];
                let view = if crossings == 0 {
                    &source.state
                } else {
                    &source.last_state
                };
                (view.clone(), crossings, Some(prev.0))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn reinforce_word<R: RngCore + ?Sized>(
        &mut self,
        index: usize,
        word: usize,
        desired: BitWord,
        depth: usize,
        level: usize,
        crossings: usize,
        rng: &mut R,
        report: &mut ReinforceReport,
    ) {
        if depth == 0 {
            return;
        }
        report.reached(level);
        let (input, next_crossings, upstream) = self.recorded_input(index, crossings);
        let first_row = word * WORD_BITS;

        for bit_index in 0..WORD_BITS {
            let row = first_row + bit_index;
            let Some(m) = mismatch(&self.cells[index].layer, row, &[input.as_slice()], desired, bit_index)
            else {
                continue;
            };
            report.rows_corrected += 1;

            for (j, &value) in input.iter().enumerate() {
                let better = correct_word(
                    &mut self.cells[index].layer,
                    m,
                    j,
                    value,
                    upstream.is_none(),
                    rng,
                    report,
                );
                if let (Some(better), Some(prev)) = (better, upstream) {
                    self.reinforce_word(
                        prev,
                        j,
                        better,
                        depth - 1,
                        level + 1,
                        next_crossings,
                        rng,
                        report,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{seeded, ReplayWords};

    /// A <- B <- A, both `width` words; B carries an extra one-word readout
    fn two_cycle(seed: u64, width: usize) -> (RecurrentNetwork, LayerId, LayerId) {
        let mut builder = RecurrentNetwork::builder();
        let a = builder.layer(width + 1, &[width], Wiring::Previous(LayerId(1)));
        let b = builder.layer(width, &[width, 1], Wiring::Previous(a));
        let net = builder.build(&mut seeded(seed)).unwrap();
        (net, a, b)
    }

    #[test]
    fn test_build_checks_wiring() {
        let mut builder = RecurrentNetwork::builder();
        builder.layer(2, &[1], Wiring::Previous(LayerId(0)));
        assert!(matches!(
            builder.build(&mut seeded(1)),
            Err(BitvoteError::ShapeMismatch { what: "recurrent wiring", expected: 2, actual: 1 })
        ));

        let mut builder = RecurrentNetwork::builder();
        builder.layer(1, &[1], Wiring::Previous(LayerId(3)));
        assert!(matches!(
            builder.build(&mut seeded(1)),
            Err(BitvoteError::DegenerateNetwork(_))
        ));

        assert!(matches!(
            RecurrentNetwork::builder().build(&mut seeded(1)),
            Err(BitvoteError::DegenerateNetwork(_))
        ));
    }

    #[test]
    fn test_reset_and_phase() {
        let (mut net, a, b) = two_cycle(1, 2);
        assert_eq!(net.phase(), Phase::Idle);
        assert!(net.state(a).unwrap().iter().all(|&w| w == 0));

        net.advance().unwrap();
        net.advance().unwrap();
        assert_eq!(net.phase(), Phase::Running);
        assert_eq!(net.tick(), 2);

        net.reset();
        assert_eq!(net.phase(), Phase::Idle);
        assert_eq!(net.tick(), 0);
        for id in [a, b] {
            assert!(net.state(id).unwrap().iter().all(|&w| w == 0));
            assert!(net.last_state(id).unwrap().iter().all(|&w| w == 0));
        }
    }

    #[test]
    fn test_advance_double_buffers() {
        let (mut net, a, b) = two_cycle(2, 2);
        for _ in 0..3 {
            let before_a = net.state(a).unwrap().to_vec();
            let before_b = net.state(b).unwrap().to_vec();
            net.advance().unwrap();
            assert_eq!(net.last_state(a).unwrap(), &before_a[..]);
            assert_eq!(net.last_state(b).unwrap(), &before_b[..]);

            // A read B's pre-tick value, B read A's fresh value
            let expect_a = net.layer(a).unwrap().compute_words(&[&before_b]).unwrap();
            assert_eq!(net.state(a).unwrap(), &expect_a[..]);
            let expect_b = net
                .layer(b)
                .unwrap()
                .compute_words(&[net.state(a).unwrap()])
                .unwrap();
            assert_eq!(net.state(b).unwrap(), &expect_b[..]);
        }
    }

    #[test]
    fn test_self_loop_reads_pre_tick_value() {
        let mut builder = RecurrentNetwork::builder();
        let s = builder.layer(2, &[2], Wiring::Previous(LayerId(0)));
        let mut net = builder.build(&mut seeded(3)).unwrap();
        for _ in 0..4 {
            let before = net.state(s).unwrap().to_vec();
            net.advance().unwrap();
            let expect = net.layer(s).unwrap().compute_words(&[&before]).unwrap();
            assert_eq!(net.state(s).unwrap(), &expect[..]);
        }
    }

    #[test]
    fn test_segment_readout() {
        let (mut net, _, b) = two_cycle(4, 3);
        net.advance().unwrap();
        let state = net.state(b).unwrap().to_vec();
        assert_eq!(net.segment(b, 0).unwrap(), &state[..3]);
        assert_eq!(net.segment(b, 1).unwrap(), &state[3..]);
        assert!(net.segment(b, 2).is_err());
    }

    #[test]
    fn test_cycle_reinforce_terminates() {
        let (mut net, _, b) = two_cycle(5, 2);
        net.advance().unwrap();
        let mut rng = seeded(6);
        let target = !net.state(b).unwrap()[2];
        let report = net.reinforce(b, 2, target, 2, &mut rng).unwrap();
        assert!(report.rows_corrected > 0);
        assert!(report.max_depth <= 1);

        // deeper budgets still terminate
        for depth in 0..=3 {
            net.advance().unwrap();
            let target = !net.state(b).unwrap()[2];
            let report = net.reinforce(b, 2, target, depth, &mut rng).unwrap();
            assert!(report.max_depth < depth.max(1));
        }
    }

    #[test]
    fn test_reinforce_reaches_upstream_layer() {
        let run = |depth: usize| {
            let (mut net, a, b) = two_cycle(12, 2);
            let mut rng = seeded(13);
            let before = net.layer(a).unwrap().clone();
            let mut reach = ReinforceReport::default();
            for _ in 0..4 {
                net.advance().unwrap();
                let target = !net.state(b).unwrap()[2];
                reach += net.reinforce(b, 2, target, depth, &mut rng).unwrap();
            }
            (net.layer(a).unwrap() != &before, reach)
        };

        let (a_changed, reach) = run(1);
        assert!(!a_changed);
        assert_eq!(reach.max_depth, 0);

        let (a_changed, reach) = run(2);
        assert!(a_changed);
        assert_eq!(reach.max_depth, 1);
    }

    #[test]
    fn test_zero_depth_is_noop() {
        let (mut net, _, b) = two_cycle(7, 2);
        net.advance().unwrap();
        let before = net.layer(b).unwrap().clone();
        let mut rng = ReplayWords::constant(u64::MAX);
        let report = net.reinforce(b, 0, !net.state(b).unwrap()[0], 0, &mut rng).unwrap();
        assert!(report.is_noop());
        assert_eq!(rng.drawn(), 0);
        assert_eq!(net.layer(b).unwrap(), &before);
    }

    #[test]
    fn test_external_input_is_leaf() {
        let mut builder = RecurrentNetwork::builder();
        let inp = builder.layer(1, &[1], Wiring::External);
        let mut net = builder.build(&mut seeded(8)).unwrap();
        let mut rng = seeded(9);

        assert!(matches!(net.set_input(inp, &[1, 2]), Err(BitvoteError::ShapeMismatch { .. })));
        let target = 0x5A5A_5A5A_5A5A_5A5Au64;
        let mut last = u32::MAX;
        for _ in 0..64 {
            net.set_input(inp, &[0xC0FFEE]).unwrap();
            net.advance().unwrap();
            let miss = (net.state(inp).unwrap()[0] ^ target).count_ones();
            assert!(miss <= last);
            last = miss;
            let report = net.reinforce(inp, 0, target, 4, &mut rng).unwrap();
            assert_eq!(report.recursions, 0);
        }
        net.advance().unwrap();
        assert_eq!(net.state(inp).unwrap()[0], target);
    }

    #[test]
    fn test_set_input_rejects_wired_layer() {
        let (mut net, a, _) = two_cycle(10, 1);
        assert!(matches!(net.set_input(a, &[0, 0]), Err(BitvoteError::NotExternal(0))));
        assert!(matches!(net.set_input(LayerId(9), &[0]), Err(BitvoteError::UnknownLayer(9))));
    }

    #[test]
    fn test_crossing_reads_last_state() {
        let (mut net, a, b) = two_cycle(11, 1);
        net.advance().unwrap();
        net.advance().unwrap();
        // B reads A without crossing, A reads B across the tick boundary
        let (input, crossings, upstream) = net.recorded_input(b.0, 0);
        assert_eq!(input, net.state(a).unwrap());
        assert_eq!((crossings, upstream), (0, Some(a.0)));
        let (input, crossings, upstream) = net.recorded_input(a.0, 0);
        assert_eq!(input, net.last_state(b).unwrap());
        assert_eq!((crossings, upstream), (1, Some(b.0)));
        // once crossed, everything is read from the previous tick
        let (input, crossings, _) = net.recorded_input(b.0, 1);
        assert_eq!(input, net.last_state(a).unwrap());
        assert_eq!(crossings, 1);
    }
}
