//! Admin passphrase check.
//!
//! A single shared static passphrase guards the admin requests. This is a
//! convenience gate, not an authentication system: there are no sessions,
//! no rate limits and no per-user accounts.

use std::fmt;

/// Stateless predicate over a configured passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminGate {
    passphrase: String,
}

impl AdminGate {
    /// Passphrase used when none is configured
    pub const DEFAULT_PASSPHRASE: &'static str = "1q2w3e4r";

    /// Gate over a configured passphrase.
    ///
    /// An empty passphrase denies every request.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self { passphrase: passphrase.into() }
    }

    /// Exact comparison with the configured passphrase.
    pub fn is_authorized(&self, supplied: &str) -> bool {
        !self.passphrase.is_empty() && self.passphrase == supplied
    }
}

impl Default for AdminGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PASSPHRASE)
    }
}

impl fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGate").field("passphrase", &"<redacted>").finish()
    }
}
