//! Admin request payloads.
//!
//! Every request in this module carries the shared admin [`Passphrase`].
//! The server checks it before touching any event state.

use serde::{Deserialize, Serialize};

/// Shared admin passphrase as sent on the wire
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw passphrase for comparison
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Fetch one event with all participants, credentials included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchEvent {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Event to fetch
    pub event_id: u128,
}

/// List every event, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEvents {
    /// Admin passphrase
    pub passphrase: Passphrase,
}

/// Create an empty, undrawn event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Display name
    pub name: String,
}

/// Delete an event together with its participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEvent {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Event to delete
    pub event_id: u128,
}

/// Register a participant in an undrawn event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParticipant {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Target event
    pub event_id: u128,
    /// Participant display name
    pub name: String,
}

/// Remove a participant from an undrawn event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveParticipant {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Participant to remove
    pub participant_id: u128,
}

/// Run the draw for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Event to draw
    pub event_id: u128,
}

/// Discard the draw of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reset {
    /// Admin passphrase
    pub passphrase: Passphrase,
    /// Event to reset
    pub event_id: u128,
}
