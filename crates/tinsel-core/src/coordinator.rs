//! Event State Coordinator
//!
//! Wraps the assignment generator with the rules a shared event record needs.
//!
//! ## State machine
//!
//! ```text
//!          add / remove participant
//!              ┌──────┐
//!              ▼      │
//!   create ─▶ Open ───┘
//!              │  ▲
//!         draw │  │ reset
//!              ▼  │
//!             Drawn ──┐
//!               ▲     │ reveal (read only)
//!               └─────┘
//! ```
//!
//! `reset` is also accepted on an `Open` event (a no-op transition). `delete`
//! is valid from either state.
//!
//! ## Design Decisions
//!
//! - **Stateless**: the coordinator holds only the environment and policy;
//!   all event state is read from and written to `Storage` on every call
//! - **One transaction per transition**: draw, reset and membership changes
//!   are each a single `Storage::update_event`, so concurrent draws of one
//!   event serialize and exactly one of them wins
//! - **Fresh stream per draw**: each draw seeds its own ChaCha20 stream from
//!   the environment

use tracing::{debug, error, warn};

use crate::{
    assignment::generate_assignment,
    constants::{MAX_NAME_CHARS, MIN_PARTICIPANTS},
    env::Environment,
    error::{DenialReason, ExchangeError},
    link::RevealLink,
    model::{
        Event, EventId, InvariantViolation, Participant, ParticipantId, ParticipantOption,
        Revelation,
    },
    storage::{Storage, StorageError},
};

/// Preconditions a draw must meet beyond "not already drawn".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPolicy {
    /// Smallest participant count allowed to draw. Values below 2 are
    /// treated as 2.
    pub min_participants: usize,
    /// Require an even participant count
    pub require_even_count: bool,
}

impl Default for DrawPolicy {
    fn default() -> Self {
        Self { min_participants: MIN_PARTICIPANTS, require_even_count: true }
    }
}

impl DrawPolicy {
    /// Check a participant count against this policy.
    ///
    /// # Errors
    ///
    /// - `InsufficientParticipants` below the minimum
    /// - `OddParticipantCount` if evenness is required and `count` is odd
    pub fn check(&self, count: usize) -> Result<(), ExchangeError> {
        let min = self.min_participants.max(MIN_PARTICIPANTS);
        if count < min {
            return Err(ExchangeError::InsufficientParticipants { count, min });
        }
        if self.require_even_count && count % 2 != 0 {
            return Err(ExchangeError::OddParticipantCount { count });
        }
        Ok(())
    }
}

/// Runs event operations against a [`Storage`].
///
/// Cheap to share: every method takes `&self`, so one coordinator can serve
/// many threads at once.
#[derive(Debug, Clone)]
pub struct EventCoordinator<E>
where
    E: Environment,
{
    env: E,
    policy: DrawPolicy,
}

impl<E> EventCoordinator<E>
where
    E: Environment,
{
    /// Coordinator with the default draw policy
    pub fn new(env: E) -> Self {
        Self::with_policy(env, DrawPolicy::default())
    }

    /// Coordinator with a custom draw policy
    pub fn with_policy(env: E, policy: DrawPolicy) -> Self {
        Self { env, policy }
    }

    /// Active draw policy
    pub fn policy(&self) -> DrawPolicy {
        self.policy
    }

    /// Environment this coordinator draws time and entropy from
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Create an empty, undrawn event.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::InvalidName` for an empty or oversized name.
    pub fn create_event(
        &self,
        storage: &impl Storage,
        name: &str,
    ) -> Result<EventId, ExchangeError> {
        let name = normalize_name(name)?;
        let event = Event::new(EventId::from(self.fresh_id()), name, self.env.now_unix_ms());
        let event_id = event.id;

        storage.insert_event(event).map_err(|e| storage_failure("create_event", e.into()))?;

        debug!(event_id = %event_id, "Created event");
        Ok(event_id)
    }

    /// Delete an event and all of its participants, drawn or not.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::EventNotFound` if there is no such event.
    pub fn delete_event(
        &self,
        storage: &impl Storage,
        event_id: EventId,
    ) -> Result<(), ExchangeError> {
        let deleted = storage
            .delete_event(event_id)
            .map_err(|e| storage_failure("delete_event", e.into()))?;
        if !deleted {
            return Err(ExchangeError::EventNotFound(event_id));
        }

        debug!(event_id = %event_id, "Deleted event");
        Ok(())
    }

    /// Add a participant to an open event.
    ///
    /// # Errors
    ///
    /// - `InvalidName` for an empty or oversized name
    /// - `EventNotFound` if there is no such event
    /// - `EventAlreadyDrawn` if the event is drawn
    pub fn add_participant(
        &self,
        storage: &impl Storage,
        event_id: EventId,
        name: &str,
    ) -> Result<ParticipantId, ExchangeError> {
        let name = normalize_name(name)?;
        let participant_id = ParticipantId::from(self.fresh_id());

        storage
            .update_event(event_id, |event| {
                if event.drawn {
                    return Err(ExchangeError::EventAlreadyDrawn(event.id));
                }
                event.participants.push(Participant::new(participant_id, name));
                Ok(())
            })
            .map_err(|e| storage_failure("add_participant", e))?;

        debug!(event_id = %event_id, participant_id = %participant_id, "Added participant");
        Ok(participant_id)
    }

    /// Remove a participant from its open event.
    ///
    /// # Errors
    ///
    /// - `ParticipantNotFound` if there is no such participant
    /// - `EventAlreadyDrawn` if the participant's event is drawn
    pub fn remove_participant(
        &self,
        storage: &impl Storage,
        participant_id: ParticipantId,
    ) -> Result<(), ExchangeError> {
        let event_id = storage
            .event_of_participant(participant_id)
            .map_err(|e| storage_failure("remove_participant", e.into()))?;

        storage
            .update_event(event_id, |event| {
                if event.drawn {
                    return Err(ExchangeError::EventAlreadyDrawn(event.id));
                }
                let before = event.participants.len();
                event.participants.retain(|p| p.id != participant_id);
                if event.participants.len() == before {
                    return Err(ExchangeError::ParticipantNotFound(participant_id));
                }
                Ok(())
            })
            .map_err(|e| match e {
                // Event deleted between the lookup and the update
                ExchangeError::EventNotFound(_) => {
                    ExchangeError::ParticipantNotFound(participant_id)
                },
                e => storage_failure("remove_participant", e),
            })?;

        debug!(event_id = %event_id, participant_id = %participant_id, "Removed participant");
        Ok(())
    }

    /// Draw an event: generate a derangement, issue credentials, mark drawn.
    ///
    /// All allocations and the `drawn` flag are committed in one storage
    /// transaction. Of several concurrent draws of the same event exactly one
    /// succeeds; the others see the committed state and fail with
    /// `AlreadyDrawn`.
    ///
    /// Not safe to retry blindly after a transient failure without checking
    /// the event first.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if there is no such event
    /// - `AlreadyDrawn` if the event is drawn
    /// - `InsufficientParticipants` / `OddParticipantCount` per the policy
    /// - `StorageUnavailable` if the datastore fails; nothing is written
    pub fn draw(&self, storage: &impl Storage, event_id: EventId) -> Result<(), ExchangeError> {
        let policy = self.policy;
        let mut rng = self.env.fresh_rng();

        let count = storage
            .update_event(event_id, |event| {
                if event.drawn {
                    return Err(ExchangeError::AlreadyDrawn(event.id));
                }
                policy.check(event.participants.len())?;

                let assignment = generate_assignment(&event.participant_ids(), &mut rng)?;
                event.apply_assignment(&assignment)?;

                debug_assert!(event.check_invariants().is_ok());
                Ok(event.participants.len())
            })
            .map_err(|e| storage_failure("draw", e))?;

        debug!(event_id = %event_id, participants = count, "Drew event");
        Ok(())
    }

    /// Discard an event's assignment and credentials.
    ///
    /// Idempotent: an undrawn event is accepted and left unchanged, so this
    /// is safe to retry.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if there is no such event
    /// - `StorageUnavailable` if the datastore fails
    pub fn reset(&self, storage: &impl Storage, event_id: EventId) -> Result<(), ExchangeError> {
        let was_drawn = storage
            .update_event(event_id, |event| {
                let was_drawn = event.drawn;
                event.clear_assignment();

                debug_assert!(event.check_invariants().is_ok());
                Ok::<_, ExchangeError>(was_drawn)
            })
            .map_err(|e| storage_failure("reset", e))?;

        debug!(event_id = %event_id, was_drawn, "Reset event");
        Ok(())
    }

    /// Reveal a participant's recipient.
    ///
    /// The credential is compared exactly: no trimming, no case folding.
    ///
    /// # Errors
    ///
    /// - `RevealDenied` for an unknown participant, an undrawn event or a
    ///   wrong credential. The three are indistinguishable to the caller.
    /// - `StorageUnavailable` if the datastore fails
    pub fn reveal(
        &self,
        storage: &impl Storage,
        participant_id: ParticipantId,
        credential: &str,
    ) -> Result<Revelation, ExchangeError> {
        let deny = |reason: DenialReason| {
            warn!(participant_id = %participant_id, ?reason, "Reveal denied");
            ExchangeError::RevealDenied(reason)
        };

        let event_id = match storage.event_of_participant(participant_id) {
            Ok(event_id) => event_id,
            Err(StorageError::ParticipantNotFound(_)) => {
                return Err(deny(DenialReason::UnknownParticipant));
            },
            Err(e) => return Err(storage_failure("reveal", e.into())),
        };
        let event = match storage.load_event(event_id) {
            Ok(event) => event,
            Err(StorageError::EventNotFound(_)) => {
                return Err(deny(DenialReason::UnknownParticipant));
            },
            Err(e) => return Err(storage_failure("reveal", e.into())),
        };

        let Some(participant) = event.participant(participant_id) else {
            return Err(deny(DenialReason::UnknownParticipant));
        };
        if !event.drawn {
            return Err(deny(DenialReason::NotDrawn));
        }
        if !participant.credential.as_ref().is_some_and(|c| c.matches(credential)) {
            return Err(deny(DenialReason::CredentialMismatch));
        }

        let recipient_id = participant
            .recipient
            .ok_or(InvariantViolation::PartialDraw { participant: participant_id })?;
        let recipient = event.participant(recipient_id).ok_or(InvariantViolation::UnknownRecipient {
            participant: participant_id,
            recipient: recipient_id,
        })?;

        debug!(event_id = %event_id, participant_id = %participant_id, "Revealed recipient");
        Ok(Revelation { event_name: event.name.clone(), recipient_name: recipient.name.clone() })
    }

    /// Reveal through a shared link (full URL or bare query string).
    ///
    /// # Errors
    ///
    /// As [`reveal`](Self::reveal). A link that does not parse is denied the
    /// same way as a wrong credential.
    pub fn reveal_by_link(
        &self,
        storage: &impl Storage,
        link: &str,
    ) -> Result<Revelation, ExchangeError> {
        let link = RevealLink::parse(link).map_err(|e| {
            warn!(error = %e, reason = ?DenialReason::MalformedLink, "Reveal denied");
            ExchangeError::RevealDenied(DenialReason::MalformedLink)
        })?;
        self.reveal(storage, link.participant_id, &link.credential)
    }

    /// Load one event, including credentials and assignments.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::EventNotFound` if there is no such event.
    pub fn fetch_event(
        &self,
        storage: &impl Storage,
        event_id: EventId,
    ) -> Result<Event, ExchangeError> {
        storage.load_event(event_id).map_err(|e| storage_failure("fetch_event", e.into()))
    }

    /// All events, newest first.
    pub fn list_events(&self, storage: &impl Storage) -> Result<Vec<Event>, ExchangeError> {
        let mut events =
            storage.list_events().map_err(|e| storage_failure("list_events", e.into()))?;
        events.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    /// Every participant of every event, sorted by name then ID.
    pub fn list_participant_options(
        &self,
        storage: &impl Storage,
    ) -> Result<Vec<ParticipantOption>, ExchangeError> {
        let events = storage
            .list_events()
            .map_err(|e| storage_failure("list_participant_options", e.into()))?;

        let mut options: Vec<ParticipantOption> = events
            .iter()
            .flat_map(|event| {
                event.participants.iter().map(move |p| ParticipantOption {
                    participant_id: p.id,
                    name: p.name.clone(),
                    event_id: event.id,
                    event_name: event.name.clone(),
                    event_drawn: event.drawn,
                })
            })
            .collect();
        options.sort_by(|a, b| a.name.cmp(&b.name).then(a.participant_id.cmp(&b.participant_id)));
        Ok(options)
    }

    /// Random nonzero 128-bit ID
    fn fresh_id(&self) -> u128 {
        loop {
            let id = self.env.random_u128();
            if id != 0 {
                return id;
            }
        }
    }
}

/// Trim a display name and enforce the length rules.
fn normalize_name(raw: &str) -> Result<String, ExchangeError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ExchangeError::InvalidName("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ExchangeError::InvalidName(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Log datastore failures; pass every error through unchanged.
fn storage_failure(operation: &'static str, err: ExchangeError) -> ExchangeError {
    if let ExchangeError::StorageUnavailable(reason) = &err {
        error!(operation, reason = %reason, "Storage unavailable");
    }
    err
}
