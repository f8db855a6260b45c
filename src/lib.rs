//! # Bitvote - Binary Associative Learning
//!
//! A minimal binary-weight recurrent network. Units are 64-bit words, synapses
//! are bit masks, and activation is a majority vote over Hamming agreement.
//! Training is online, one symbol at a time, with no gradient and no loss:
//! mismatched output bits are pushed toward a target by randomly flipping
//! either the synapse or the upstream activation that caused them.
//!
//! ## Core Components
//!
//! - **BitWord**: The fundamental unit (`u64`, agreement = 64 − popcount(a ^ b))
//! - **Layer**: Weight matrix, one row per output bit, majority-vote forward pass
//! - **Graph**: Layers applied to explicit provenance DAGs, truncated to bound history
//! - **RecurrentNetwork**: Fixed cyclic layer topology with double-buffered state
//! - **Reinforcement**: Randomized, depth-bounded credit split between weight and input
//!
//! ## Design Principles
//!
//! - **No floats**: Integer popcounts and bit masks throughout
//! - **Explicit randomness**: Every random draw comes from a caller-supplied `RngCore`
//! - **Bounded history**: Truncation (graph) or depth budgets (recurrent) stop recursion
//! - **Single-threaded**: One training step in flight at a time
//!
//! ## Example
//!
//! ```
//! use bitvote::{entropy, Layer};
//!
//! let mut rng = entropy::seeded(1);
//! let layer = Layer::new(2, &[1], &mut rng)?;
//! let input = [0xDEAD_BEEFu64, 0];
//! let output = layer.compute_words(&[&input[..]])?;
//! assert_eq!(output.len(), 1);
//! # Ok::<(), bitvote::BitvoteError>(())
//! ```

// BitWord primitives
pub mod word;
pub use word::{agreement, score, vote, BitWord, WORD_BITS};

// Weight matrix
mod layer;
pub use layer::{Layer, LayerId};

// Randomized credit assignment shared by both variants
mod reinforce;
pub use reinforce::ReinforceReport;

// Provenance-graph variant
pub mod graph;
pub use graph::{Graph, State, StateRef};

// Recurrent variant
pub mod recurrent;
pub use recurrent::{Phase, RecurrentBuilder, RecurrentNetwork, Wiring};

// Randomness sources
pub mod entropy;

// Training configuration
pub mod config;
pub use config::{TrainConfig, Variant};

// Driver loop
pub mod trainer;
pub use trainer::{build_learner, EpochReport, GraphTrainer, RecurrentTrainer, SequenceLearner};

// Error types
mod error;
pub use error::{BitvoteError, Result};
