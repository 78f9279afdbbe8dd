//! Datastore abstraction.
//!
//! The coordinator never holds event state between calls; it reads and writes
//! through [`Storage`]. Every state transition is one
//! [`Storage::update_event`] call, which is the only write primitive that
//! touches an existing event.
//!
//! # Transaction contract
//!
//! `update_event` runs the closure on a working copy of the event while
//! holding the store's write lock for that event, and commits the copy only
//! if the closure returns `Ok`. Two concurrent updates of the same event are
//! serialized, and a reader never observes a copy mid-edit.

mod memory;

pub use memory::MemoryStorage;
use thiserror::Error;

use crate::model::{Event, EventId, ParticipantId};

/// Errors from storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No event with this ID
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// No participant with this ID
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Write would break a uniqueness constraint (duplicate ID)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Datastore unreachable or refused the operation
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Persistent store of events and their participants.
///
/// Implementations must be safe to share between threads. Participant IDs
/// are unique across all events.
pub trait Storage: Send + Sync {
    /// Store a new event.
    ///
    /// # Errors
    ///
    /// `Conflict` if the event ID or any participant ID is already taken.
    fn insert_event(&self, event: Event) -> Result<(), StorageError>;

    /// Load a committed event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` if absent.
    fn load_event(&self, id: EventId) -> Result<Event, StorageError>;

    /// All committed events, in no particular order
    fn list_events(&self) -> Result<Vec<Event>, StorageError>;

    /// Delete an event and all its participants.
    ///
    /// Returns `false` if there was nothing to delete.
    fn delete_event(&self, id: EventId) -> Result<bool, StorageError>;

    /// Event that owns a participant.
    ///
    /// # Errors
    ///
    /// `ParticipantNotFound` if no event has this participant.
    fn event_of_participant(&self, id: ParticipantId) -> Result<EventId, StorageError>;

    /// Atomically read-modify-write one event.
    ///
    /// `f` receives a working copy. If it returns `Ok`, the copy replaces
    /// the stored event and the participant index is rebuilt for it. If it
    /// returns `Err`, nothing is written.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if absent
    /// - `Conflict` if the edited copy reuses another event's participant ID
    /// - `Unavailable` if the write could not be committed
    /// - whatever `f` returns
    fn update_event<T, E, F>(&self, id: EventId, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Event) -> Result<T, E>;
}
