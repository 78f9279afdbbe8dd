//! Production Environment implementation.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{RngCore, rngs::OsRng};
use tinsel_core::env::Environment;

/// System clock and OS entropy.
///
/// Every draw reseeds its ChaCha20 stream from `OsRng`, so assignments and
/// credentials cannot be predicted from earlier output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now_unix_ms(&self) -> u64 {
        // A clock before 1970 is reported as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        OsRng.fill_bytes(buffer);
    }
}
