use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use super::{Storage, StorageError};
use crate::model::{Event, EventId, ParticipantId};

/// In-memory storage implementation for tests, simulation and the reference
/// server.
///
/// Events live in a `BTreeMap` (deterministic iteration) with a secondary
/// index from participant ID to owning event. All state is wrapped in
/// `Arc<Mutex<>>` so clones share one store.
///
/// # Thread Safety
///
/// A single mutex guards both maps, so `update_event` is serializable. A
/// poisoned mutex (a thread panicked mid-operation) is reported as
/// `Unavailable` rather than propagated as a panic.
///
/// # Fault injection
///
/// [`MemoryStorage::set_available`] takes the store offline, and
/// [`MemoryStorage::fail_next_commit`] makes the next `update_event` fail
/// after its closure has run. Both exist so tests can check that failed
/// writes leave nothing behind.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
    faults: Arc<Faults>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Committed events by ID
    events: BTreeMap<EventId, Event>,

    /// Owning event of every stored participant
    participants: HashMap<ParticipantId, EventId>,
}

struct Faults {
    available: AtomicBool,
    fail_next_commit: AtomicBool,
}

impl Default for Faults {
    fn default() -> Self {
        Self { available: AtomicBool::new(true), fail_next_commit: AtomicBool::new(false) }
    }
}

impl MemoryStorage {
    /// Create a new empty MemoryStorage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub fn event_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.events.len())
    }

    /// Number of stored participants across all events
    pub fn participant_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.participants.len())
    }

    /// Take the store offline (`false`) or bring it back (`true`).
    ///
    /// While offline every operation fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.faults.available.store(available, Ordering::SeqCst);
    }

    /// Make the next `update_event` fail with `Unavailable` after its
    /// closure succeeds, without committing.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStorageInner>, StorageError> {
        if !self.faults.available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory storage offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage mutex poisoned".to_string()))
    }
}

impl MemoryStorageInner {
    /// Fails if any participant of `event` is indexed under a different event.
    fn check_participant_ids(&self, event: &Event) -> Result<(), StorageError> {
        let mut seen = HashSet::with_capacity(event.participants.len());
        for participant in &event.participants {
            if !seen.insert(participant.id) {
                return Err(StorageError::Conflict(format!(
                    "participant {} appears twice in event {}",
                    participant.id, event.id
                )));
            }
            match self.participants.get(&participant.id) {
                Some(owner) if *owner != event.id => {
                    return Err(StorageError::Conflict(format!(
                        "participant {} already belongs to event {owner}",
                        participant.id
                    )));
                },
                _ => {},
            }
        }
        Ok(())
    }

    /// Drops the index entries of `event`'s participants only.
    fn unindex(&mut self, event: &Event) {
        for participant in &event.participants {
            self.participants.remove(&participant.id);
        }
    }

    fn index(&mut self, event: &Event) {
        for participant in &event.participants {
            self.participants.insert(participant.id, event.id);
        }
    }
}

impl Storage for MemoryStorage {
    fn insert_event(&self, event: Event) -> Result<(), StorageError> {
        let mut inner = self.lock()?;

        if inner.events.contains_key(&event.id) {
            return Err(StorageError::Conflict(format!("event {} already exists", event.id)));
        }
        inner.check_participant_ids(&event)?;

        inner.index(&event);
        inner.events.insert(event.id, event);
        Ok(())
    }

    fn load_event(&self, id: EventId) -> Result<Event, StorageError> {
        self.lock()?.events.get(&id).cloned().ok_or(StorageError::EventNotFound(id))
    }

    fn list_events(&self) -> Result<Vec<Event>, StorageError> {
        Ok(self.lock()?.events.values().cloned().collect())
    }

    fn delete_event(&self, id: EventId) -> Result<bool, StorageError> {
        let mut inner = self.lock()?;

        let Some(event) = inner.events.remove(&id) else {
            return Ok(false);
        };
        inner.unindex(&event);
        Ok(true)
    }

    fn event_of_participant(&self, id: ParticipantId) -> Result<EventId, StorageError> {
        self.lock()?.participants.get(&id).copied().ok_or(StorageError::ParticipantNotFound(id))
    }

    fn update_event<T, E, F>(&self, id: EventId, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Event) -> Result<T, E>,
    {
        let mut inner = self.lock()?;

        let mut working = inner.events.get(&id).cloned().ok_or(StorageError::EventNotFound(id))?;
        let output = f(&mut working)?;

        debug_assert_eq!(working.id, id, "update_event closure must not change the event id");
        inner.check_participant_ids(&working)?;

        if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Unavailable("commit failed".to_string()).into());
        }

        if let Some(previous) = inner.events.remove(&id) {
            inner.unindex(&previous);
        }
        inner.index(&working);
        inner.events.insert(id, working);

        Ok(output)
    }
}
