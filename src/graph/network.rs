//! Graph - Layers applied to explicit provenance graphs
//!
//! The graph owns its layers; states refer to them by `LayerId`. A forward
//! pass allocates one state per output segment, each recording the input
//! states and the layer that produced it. Reinforcement walks that record
//! backward until it reaches leaves, so the reach of a correction is bounded
//! by how far the caller has truncated provenance.

use std::collections::HashSet;
use std::rc::Rc;

use rand::RngCore;

use super::state::{input_positions, Provenance, State, StateRef};
use crate::error::{BitvoteError, Result};
use crate::layer::{Layer, LayerId};
use crate::reinforce::{correct_word, mismatch, ReinforceReport};
use crate::word::{BitWord, WORD_BITS};

/// Arena of layers for the provenance-graph variant
#[derive(Clone, Debug, Default)]
pub struct Graph {
    layers: Vec<Layer>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer and return its id
    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers.get(id.0).ok_or(BitvoteError::UnknownLayer(id.0))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.layers.get_mut(id.0).ok_or(BitvoteError::UnknownLayer(id.0))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Apply layer `id` to the concatenation of `inputs`
    ///
    /// Returns one new state per output segment. Every returned state shares
    /// the same producer list.
    pub fn compute(&self, id: LayerId, inputs: &[StateRef]) -> Result<Vec<StateRef>> {
        let layer = self.layer(id)?;
        let parts: Vec<&[BitWord]> = inputs.iter().map(|s| s.value()).collect();
        let words = layer.compute_words(&parts)?;
        Ok(layer
            .segments()
            .map(|(offset, width)| {
                State::computed(
                    words[offset..offset + width].to_vec(),
                    Provenance {
                        producers: inputs.to_vec(),
                        layer: id,
                        offset,
                    },
                )
            })
            .collect())
    }

    /// Push word `word` of `state` toward `desired`
    ///
    /// A leaf target is a silent no-op: its history is gone.
    pub fn reinforce<R: RngCore + ?Sized>(
        &mut self,
        state: &State,
        word: usize,
        desired: BitWord,
        rng: &mut R,
    ) -> Result<ReinforceReport> {
        if word >= state.len() {
            return Err(BitvoteError::WordOutOfRange {
                index: word,
                width: state.len(),
            });
        }
        self.check_history(state)?;
        let mut report = ReinforceReport::default();
        self.reinforce_word(state, word, desired, 0, rng, &mut report);
        Ok(report)
    }

    /// Reinforce every word of `state` toward `desired`, in order
    pub fn reinforce_value<R: RngCore + ?Sized>(
        &mut self,
        state: &State,
        desired: &[BitWord],
        rng: &mut R,
    ) -> Result<ReinforceReport> {
        if desired.len() != state.len() {
            return Err(BitvoteError::shape("desired value", state.len(), desired.len()));
        }
        let mut report = ReinforceReport::default();
        for (word, &value) in desired.iter().enumerate() {
            report += self.reinforce(state, word, value, rng)?;
        }
        Ok(report)
    }

    /// Every provenance reachable from `root` must name a layer of this graph
    /// with enough rows for its segment and the right input width
    fn check_history(&self, root: &State) -> Result<()> {
        let mut seen: HashSet<*const State> = HashSet::new();
        let mut pending = Vec::new();
        self.check_provenance(root, &mut pending)?;
        while let Some(state) = pending.pop() {
            if seen.insert(Rc::as_ptr(&state)) {
                self.check_provenance(&state, &mut pending)?;
            }
        }
        Ok(())
    }

    fn check_provenance(&self, state: &State, pending: &mut Vec<StateRef>) -> Result<()> {
        let Some(provenance) = state.provenance() else {
            return Ok(());
        };
        let layer = self.layer(provenance.layer)?;
        let rows = (provenance.offset + state.len()) * WORD_BITS;
        if rows > layer.rows() {
            return Err(BitvoteError::shape("provenance rows", layer.rows(), rows));
        }
        let width: usize = provenance.producers.iter().map(|p| p.len()).sum();
        if width != layer.input_words() {
            return Err(BitvoteError::shape("provenance input", layer.input_words(), width));
        }
        pending.extend(provenance.producers);
        Ok(())
    }

    fn reinforce_word<R: RngCore + ?Sized>(
        &mut self,
        state: &State,
        word: usize,
        desired: BitWord,
        level: usize,
        rng: &mut R,
        report: &mut ReinforceReport,
    ) {
        let Some(provenance) = state.provenance() else {
            return;
        };
        report.reached(level);
        let producers = provenance.producers;
        let layer_index = provenance.layer.index();
        let parts: Vec<&[BitWord]> = producers.iter().map(|s| s.value()).collect();
        let first_row = (provenance.offset + word) * WORD_BITS;

        for bit_index in 0..WORD_BITS {
            let row = first_row + bit_index;
            let Some(m) = mismatch(&self.layers[layer_index], row, &parts, desired, bit_index)
            else {
                continue;
            };
            report.rows_corrected += 1;

            for (j, (owner, local)) in input_positions(&producers).enumerate() {
                let producer = &producers[owner];
                let input = producer.value()[local];
                let upstream = correct_word(
                    &mut self.layers[layer_index],
                    m,
                    j,
                    input,
                    producer.is_leaf(),
                    rng,
                    report,
                );
                if let Some(better) = upstream {
                    self.reinforce_word(producer, local, better, level + 1, rng, report);
                }
            }
        }
    }
}
