//! Randomness sources
//!
//! Every operation that draws random words takes an explicit `&mut R` where
//! `R: RngCore`. Nothing in the crate touches a global generator, so a run is
//! reproducible from its seed and the order of calls.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::word::BitWord;

/// Seeded generator for reproducible runs
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Generator seeded from the thread-local source
///
/// Falls back to seed 0, with a warning, if the thread-local source fails.
pub fn unseeded() -> StdRng {
    match StdRng::from_rng(rand::thread_rng()) {
        Ok(rng) => rng,
        Err(e) => {
            log::warn!("thread rng unavailable ({}), falling back to seed 0", e);
            seeded(0)
        }
    }
}

/// Scripted word source that replays a fixed sequence, cycling at the end
///
/// Lets tests pin the exact masks drawn by reinforcement.
#[derive(Clone, Debug)]
pub struct ReplayWords {
    words: Vec<BitWord>,
    cursor: usize,
    drawn: usize,
}

impl ReplayWords {
    /// Replay `words` in order. An empty script yields zeros.
    pub fn new(words: Vec<BitWord>) -> Self {
        Self {
            words,
            cursor: 0,
            drawn: 0,
        }
    }

    /// Source that always yields the same word
    pub fn constant(word: BitWord) -> Self {
        Self::new(vec![word])
    }

    /// Number of words drawn so far
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl RngCore for ReplayWords {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.drawn += 1;
        if self.words.is_empty() {
            return 0;
        }
        let word = self.words[self.cursor];
        self.cursor = (self.cursor + 1) % self.words.len();
        word
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
