//! Sequence training - the symbol-by-symbol driver loop
//!
//! For every byte of a training text the learner predicts the next symbol,
//! reads the prediction from the low byte of its readout word, and reinforces
//! that word toward the actual symbol. Only the low byte of the target is
//! overwritten; the other bits keep their predicted values, so nothing but the
//! observable byte drives the correction.

use std::rc::Rc;

use rand::rngs::StdRng;

use crate::config::{TrainConfig, Variant};
use crate::entropy;
use crate::error::Result;
use crate::graph::{Graph, State, StateRef};
use crate::layer::{Layer, LayerId};
use crate::recurrent::{RecurrentNetwork, Wiring};
use crate::reinforce::ReinforceReport;
use crate::word::{low_byte, with_low_byte, BitWord};

/// Outcome of one pass over a text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EpochReport {
    /// Predicted byte for every position, made before seeing it
    pub predicted: Vec<u8>,
    /// Positions where the prediction equalled the actual byte
    pub matches: usize,
    /// Accumulated reinforcement activity
    pub reinforce: ReinforceReport,
}

impl EpochReport {
    fn record(&mut self, predicted: u8, actual: u8) {
        self.predicted.push(predicted);
        if predicted == actual {
            self.matches += 1;
        }
    }

    /// Predictions rendered as text (non-UTF-8 bytes replaced)
    pub fn predicted_text(&self) -> String {
        String::from_utf8_lossy(&self.predicted).into_owned()
    }
}

/// Anything that can be trained online on a byte sequence
pub trait SequenceLearner {
    /// One pass over `text`, starting from a cleared state
    fn train_epoch(&mut self, text: &[u8]) -> Result<EpochReport>;

    /// Clear recurrent state (weights are kept)
    fn reset(&mut self);

    /// Epochs trained so far
    fn epochs(&self) -> usize;
}

/// Build the learner selected by `config`
pub fn build_learner(config: &TrainConfig) -> Result<Box<dyn SequenceLearner>> {
    config.validate()?;
    let rng = match config.seed {
        Some(seed) => entropy::seeded(seed),
        None => entropy::unseeded(),
    };
    Ok(match config.variant {
        Variant::Graph => Box::new(GraphTrainer::new(config, rng)?),
        Variant::Recurrent => Box::new(RecurrentTrainer::new(config, rng)?),
    })
}

// ============================================================================
// Graph variant
// ============================================================================

/// One layer mapping `[symbol?, state]` to `[next state, readout]`
pub struct GraphTrainer {
    graph: Graph,
    layer: LayerId,
    state: StateRef,
    state_words: usize,
    feed_input: bool,
    truncate_depth: usize,
    rng: StdRng,
    epochs: usize,
}

impl GraphTrainer {
    pub fn new(config: &TrainConfig, mut rng: StdRng) -> Result<Self> {
        let input_words = config.state_words + usize::from(config.feed_input);
        let mut graph = Graph::new();
        let layer = graph.add_layer(Layer::new(input_words, &[config.state_words, 1], &mut rng)?);
        Ok(Self {
            graph,
            layer,
            state: State::zeroed(config.state_words),
            state_words: config.state_words,
            feed_input: config.feed_input,
            truncate_depth: config.truncate_depth,
            rng,
            epochs: 0,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Predict, read out and reinforce one symbol
    fn step(&mut self, previous: u8, actual: u8, report: &mut EpochReport) -> Result<()> {
        let mut inputs = Vec::with_capacity(2);
        if self.feed_input {
            inputs.push(State::input(vec![previous as BitWord]));
        }
        inputs.push(Rc::clone(&self.state));

        let out = self.graph.compute(self.layer, &inputs)?;
        self.state = Rc::clone(&out[0]);
        self.state.truncate(self.truncate_depth);

        let word = out[1].value()[0];
        report.record(low_byte(word), actual);
        report.reinforce += self
            .graph
            .reinforce(&out[1], 0, with_low_byte(word, actual), &mut self.rng)?;
        Ok(())
    }
}

impl SequenceLearner for GraphTrainer {
    fn train_epoch(&mut self, text: &[u8]) -> Result<EpochReport> {
        self.reset();
        let mut report = EpochReport::default();
        let mut previous = 0u8;
        for &symbol in text {
            self.step(previous, symbol, &mut report)?;
            previous = symbol;
        }
        self.epochs += 1;
        log::debug!(
            "graph epoch {}: {}/{} matched, {} rows corrected",
            self.epochs,
            report.matches,
            text.len(),
            report.reinforce.rows_corrected
        );
        Ok(report)
    }

    fn reset(&mut self) {
        self.state = State::zeroed(self.state_words);
    }

    fn epochs(&self) -> usize {
        self.epochs
    }
}

// ============================================================================
// Recurrent variant
// ============================================================================

/// Hidden layer and output layer wired into a two-layer cycle
///
/// The hidden layer reads the whole output state (state words plus readout
/// word); the output layer reads the hidden state and appends the readout.
pub struct RecurrentTrainer {
    net: RecurrentNetwork,
    output: LayerId,
    readout_word: usize,
    depth: usize,
    rng: StdRng,
    epochs: usize,
}

impl RecurrentTrainer {
    pub fn new(config: &TrainConfig, mut rng: StdRng) -> Result<Self> {
        if config.feed_input {
            log::warn!("feed_input is ignored by the recurrent variant");
        }
        let n = config.state_words;
        let mut builder = RecurrentNetwork::builder();
        let hidden = builder.layer(n + 1, &[n], Wiring::Previous(LayerId(1)));
        let output = builder.layer(n, &[n, 1], Wiring::Previous(hidden));
        let net = builder.build(&mut rng)?;
        Ok(Self {
            net,
            output,
            readout_word: n,
            depth: config.reinforce_depth,
            rng,
            epochs: 0,
        })
    }

    pub fn network(&self) -> &RecurrentNetwork {
        &self.net
    }

    fn step(&mut self, actual: u8, report: &mut EpochReport) -> Result<()> {
        self.net.advance()?;
        let word = self.net.state(self.output)?[self.readout_word];
        report.record(low_byte(word), actual);
        report.reinforce += self.net.reinforce(
            self.output,
            self.readout_word,
            with_low_byte(word, actual),
            self.depth,
            &mut self.rng,
        )?;
        Ok(())
    }
}

impl SequenceLearner for RecurrentTrainer {
    fn train_epoch(&mut self, text: &[u8]) -> Result<EpochReport> {
        self.reset();
        let mut report = EpochReport::default();
        for &symbol in text {
            self.step(symbol, &mut report)?;
        }
        self.epochs += 1;
        log::debug!(
            "recurrent epoch {}: {}/{} matched, {} rows corrected",
            self.epochs,
            report.matches,
            text.len(),
            report.reinforce.rows_corrected
        );
        Ok(report)
    }

    fn reset(&mut self) {
        self.net.reset();
    }

    fn epochs(&self) -> usize {
        self.epochs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"Hello I am Alex";

    #[test]
    fn test_graph_epoch_predicts_every_symbol() {
        let mut learner = build_learner(&TrainConfig::quick(1)).unwrap();
        let report = learner.train_epoch(TEXT).unwrap();
        assert_eq!(report.predicted.len(), TEXT.len());
        assert!(report.matches <= TEXT.len());
        assert_eq!(learner.epochs(), 1);
    }

    #[test]
    fn test_graph_training_is_reproducible() {
        let run = |config: &TrainConfig| {
            let mut learner = build_learner(config).unwrap();
            (0..5).map(|_| learner.train_epoch(TEXT).unwrap()).collect::<Vec<_>>()
        };
        let config = TrainConfig::quick(2);
        assert_eq!(run(&config), run(&config));

        let fed = TrainConfig { feed_input: true, ..TrainConfig::quick(2) };
        assert_eq!(run(&fed), run(&fed));
    }

    #[test]
    fn test_graph_readout_reinforcement_touches_weights() {
        let config = TrainConfig::quick(3);
        let mut trainer = GraphTrainer::new(&config, entropy::seeded(3)).unwrap();
        let before = trainer.graph().layers().to_vec();
        let report = trainer.train_epoch(TEXT).unwrap();
        if report.reinforce.rows_corrected > 0 {
            assert_ne!(trainer.graph().layers(), &before[..]);
        }
        // truncate_depth 2 leaves the previous state a leaf, so no recursion
        assert_eq!(report.reinforce.recursions, 0);
    }

    #[test]
    fn test_recurrent_epoch() {
        let config = TrainConfig {
            state_words: 2,
            reinforce_depth: 2,
            ..TrainConfig::recurrent()
        };
        let mut trainer = RecurrentTrainer::new(&config, entropy::seeded(4)).unwrap();
        let report = trainer.train_epoch(TEXT).unwrap();
        assert_eq!(report.predicted.len(), TEXT.len());
        assert_eq!(trainer.network().tick(), TEXT.len() as u64);
        assert!(report.reinforce.max_depth < 2);

        trainer.reset();
        assert_eq!(trainer.network().tick(), 0);
    }

    #[test]
    fn test_many_epochs_both_variants() {
        let text = b"abababababababab";
        let recurrent = TrainConfig {
            variant: Variant::Recurrent,
            ..TrainConfig::quick(5)
        };
        for config in [TrainConfig::quick(5), recurrent] {
            let mut learner = build_learner(&config).unwrap();
            for _ in 0..10 {
                let report = learner.train_epoch(text).unwrap();
                assert_eq!(report.predicted.len(), text.len());
            }
            assert_eq!(learner.epochs(), 10);
        }
    }
}
