//! # Provenance-Graph Variant
//!
//! One reusable layer applied to arbitrary lists of states. Every forward
//! pass records what it consumed, building a DAG that reinforcement walks
//! backward and truncation keeps bounded.
//!
//! ## Example
//!
//! ```
//! use bitvote::graph::{Graph, State};
//! use bitvote::{entropy, Layer};
//! use std::rc::Rc;
//!
//! let mut rng = entropy::seeded(42);
//! let mut graph = Graph::new();
//! let id = graph.add_layer(Layer::new(4, &[4, 1], &mut rng)?);
//!
//! let mut state = State::zeroed(4);
//! for &c in b"abc" {
//!     let out = graph.compute(id, &[Rc::clone(&state)])?;
//!     state = Rc::clone(&out[0]);
//!     state.truncate(2);
//!     graph.reinforce(&out[1], 0, c as u64, &mut rng)?;
//! }
//! # Ok::<(), bitvote::BitvoteError>(())
//! ```

mod state;
pub use state::{State, StateRef};

mod network;
pub use network::Graph;
