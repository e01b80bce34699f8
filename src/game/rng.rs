//! Shared random source
//!
//! One ChaCha generator behind a mutex. Every draw goes through the lock;
//! callers that need many draws in a row (map generation) take a
//! [`SharedRng::fork`] instead so the lock is held for a single draw.
//! Seeding it makes layouts and team assignment reproducible.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Alphabet for player and session identifiers
pub const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// Identifier length
pub const ID_LEN: usize = 16;

#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<ChaCha8Rng>>,
}

impl SharedRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::from_entropy())),
        }
    }

    /// Seeded when a seed is configured, from OS entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }

    /// Run `f` with exclusive access to the generator
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.inner.lock();
        f(&mut rng)
    }

    /// Private generator seeded from one draw of the shared one
    pub fn fork(&self) -> ChaCha8Rng {
        self.with(|rng| ChaCha8Rng::seed_from_u64(rng.gen()))
    }

    pub fn identifier(&self) -> String {
        self.with(|rng| random_identifier(rng))
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&self, items: &mut [T]) {
        self.with(|rng| items.shuffle(rng));
    }
}

pub fn random_identifier<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_CHARS[rng.gen_range(0..ID_CHARS.len())] as char)
        .collect()
}
