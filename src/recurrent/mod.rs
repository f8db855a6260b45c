//! # Recurrent Variant
//!
//! A small fixed set of layers wired into a cycle, each holding one live
//! state and one double-buffered last state, advanced in discrete ticks.
//!
//! ## Example
//!
//! ```
//! use bitvote::recurrent::{RecurrentNetwork, Wiring};
//! use bitvote::{entropy, LayerId};
//!
//! let mut rng = entropy::seeded(7);
//! let mut builder = RecurrentNetwork::builder();
//! let hidden = builder.layer(5, &[4], Wiring::Previous(LayerId(1)));
//! let out = builder.layer(4, &[4, 1], Wiring::Previous(hidden));
//! let mut net = builder.build(&mut rng)?;
//!
//! net.advance()?;
//! let predicted = net.segment(out, 1)?[0];
//! net.reinforce(out, 4, (predicted & !0xff) | b'x' as u64, 3, &mut rng)?;
//! # Ok::<(), bitvote::BitvoteError>(())
//! ```

mod network;
pub use network::{Phase, RecurrentBuilder, RecurrentNetwork, Wiring};
