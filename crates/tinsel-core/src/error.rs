//! Error types for the Tinsel core.
//!
//! [`ExchangeError`] is the single error surfaced by the coordinator. Every
//! variant maps to a distinct remedy for the caller (add participants, wait
//! for the draw, re-check the credential, retry later), so none of them is
//! recovered from locally.

use thiserror::Error;

use crate::{
    model::{EventId, InvariantViolation, ParticipantId},
    storage::StorageError,
};

/// Why a reveal was refused.
///
/// Only for logs and tests. It is deliberately not part of the `Display`
/// output of [`ExchangeError::RevealDenied`] and never reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No participant with that ID
    UnknownParticipant,
    /// The participant's event has not been drawn
    NotDrawn,
    /// The supplied credential differs from the issued one
    CredentialMismatch,
    /// A reveal link is missing `pid` or `key`, or either is malformed
    MalformedLink,
}

/// Errors returned by coordinator operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Generator called with bad input (fewer than two or duplicate IDs)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Event has too few participants to draw
    #[error("not enough participants: need at least {min}, have {count}")]
    InsufficientParticipants {
        /// Current participant count
        count: usize,
        /// Minimum required by the draw policy
        min: usize,
    },

    /// Draw policy requires an even participant count
    #[error("participant count must be even, have {count}")]
    OddParticipantCount {
        /// Current participant count
        count: usize,
    },

    /// Draw attempted on an event that is already drawn
    #[error("event already drawn: {0}")]
    AlreadyDrawn(EventId),

    /// Membership change attempted on a drawn event
    #[error("event {0} is drawn; reset it before changing participants")]
    EventAlreadyDrawn(EventId),

    /// Reveal refused (unknown participant, not drawn, or wrong credential)
    #[error("reveal denied")]
    RevealDenied(DenialReason),

    /// Event does not exist
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Participant does not exist
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Event or participant name rejected
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Stored event breaks the draw invariant
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Datastore could not be reached or refused the write
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ExchangeError {
    /// Returns true if retrying the same request may succeed.
    ///
    /// Only datastore failures are transient. Every other variant reflects
    /// the event's state or the caller's input and will fail again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<StorageError> for ExchangeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EventNotFound(id) => Self::EventNotFound(id),
            StorageError::ParticipantNotFound(id) => Self::ParticipantNotFound(id),
            StorageError::Conflict(reason) => Self::StorageUnavailable(format!("conflict: {reason}")),
            StorageError::Unavailable(reason) => Self::StorageUnavailable(reason),
        }
    }
}
