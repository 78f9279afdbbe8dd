//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples the draw logic from system resources
//! (wall clock, entropy). This enables:
//!
//! - Deterministic tests: the harness provides a manual clock and a seeded
//!   RNG, so a failing draw can be replayed exactly.
//! - Production runtime: the server uses the system clock and OS entropy
//!   without any change to the coordinator.
//!
//! # Invariants
//!
//! - Determinism: given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: implementations must not share global state

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Abstract environment providing time and randomness.
///
/// # Implementations
///
/// - Simulation (`tinsel-harness::SimEnv`): manual clock, seeded ChaCha20.
/// - Production (`tinsel-server::SystemEnv`): system clock, OS entropy.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current wall-clock time in milliseconds since the Unix
    /// epoch. Used for event creation timestamps only.
    fn now_unix_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// Production implementations MUST use OS entropy. Simulation
    /// implementations MUST be seeded and log or expose their seed.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random `u128`.
    ///
    /// Used for event and participant IDs.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }

    /// Returns a ChaCha20 stream seeded from 32 fresh bytes of entropy.
    ///
    /// Every draw gets its own stream, so one draw's shuffle and credentials
    /// cannot be predicted from the order of earlier calls.
    fn fresh_rng(&self) -> ChaCha20Rng {
        let mut seed = [0u8; 32];
        self.random_bytes(&mut seed);
        ChaCha20Rng::from_seed(seed)
    }
}
