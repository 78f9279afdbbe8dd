//! Seeded environment for unit tests inside this crate.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::env::Environment;

#[derive(Clone)]
pub(crate) struct TestEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    clock_ms: Arc<AtomicU64>,
}

impl TestEnv {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            clock_ms: Arc::new(AtomicU64::new(1_700_000_000_000)),
        }
    }

    pub(crate) fn advance_ms(&self, ms: u64) {
        self.clock_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Environment for TestEnv {
    fn now_unix_ms(&self) -> u64 {
        self.clock_ms.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("test rng poisoned").fill_bytes(buffer);
    }
}
