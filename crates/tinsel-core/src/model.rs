//! Events, participants and the drawn/undrawn invariant.
//!
//! An [`Event`] is either fully undrawn (no participant holds a credential or
//! a recipient) or fully drawn (every participant holds both, and the
//! recipients form a derangement). [`Event::check_invariants`] is the single
//! place that knows this rule; the coordinator asserts it after every commit
//! and the harness oracles assert it in tests.

use std::{collections::BTreeSet, fmt};

use rand::Rng;
use thiserror::Error;

use crate::{
    assignment::Assignment,
    constants::{CREDENTIAL_ALPHABET, CREDENTIAL_LEN},
};

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u128);

        impl $name {
            /// Wrap a raw 128-bit ID
            pub const fn new(raw: u128) -> Self {
                Self(raw)
            }

            /// Raw 128-bit value, as carried on the wire
            pub const fn as_u128(self) -> u128 {
                self.0
            }

            /// Parse 1 to 32 hex digits (either case)
            pub fn from_hex(s: &str) -> Option<Self> {
                if s.is_empty() || s.len() > 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return None;
                }
                u128::from_str_radix(s, 16).ok().map(Self)
            }
        }

        impl From<u128> for $name {
            fn from(raw: u128) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:032x}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:032x})", stringify!($name), self.0)
            }
        }
    };
}

hex_id! {
    /// Opaque event identity
    EventId
}

hex_id! {
    /// Opaque participant identity, unique across all events
    ParticipantId
}

/// Short secret issued to one participant at draw time.
///
/// Compared exactly: no trimming, no case folding. `Debug` never prints the
/// value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a stored credential
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Draw a fresh credential of [`CREDENTIAL_LEN`] lowercase letters.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value = (0..CREDENTIAL_LEN)
            .map(|_| char::from(CREDENTIAL_ALPHABET[rng.gen_range(0..CREDENTIAL_ALPHABET.len())]))
            .collect();
        Self(value)
    }

    /// Exact comparison against a caller-supplied string.
    ///
    /// Runs over the full length of equal-length inputs with no early exit.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let supplied = candidate.as_bytes();
        if expected.len() != supplied.len() {
            return false;
        }
        expected.iter().zip(supplied).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }

    /// The credential text, for the admin view and reveal links
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

/// A member of exactly one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identity
    pub id: ParticipantId,
    /// Display name (trimmed, non-empty, not unique)
    pub name: String,
    /// Issued at draw time, cleared on reset
    pub credential: Option<Credential>,
    /// Who this participant gives to; set at draw time, cleared on reset
    pub recipient: Option<ParticipantId>,
}

impl Participant {
    /// A participant with no draw state
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), credential: None, recipient: None }
    }
}

/// Draw state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Accepting membership changes, no assignment
    Open,
    /// Assignment and credentials issued
    Drawn,
}

/// A gift-exchange event and its participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identity
    pub id: EventId,
    /// Display name
    pub name: String,
    /// True iff every participant holds a credential and a recipient
    pub drawn: bool,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
    /// Participants in insertion order
    pub participants: Vec<Participant>,
}

impl Event {
    /// An empty, undrawn event
    pub fn new(id: EventId, name: impl Into<String>, created_at_ms: u64) -> Self {
        Self { id, name: name.into(), drawn: false, created_at_ms, participants: Vec::new() }
    }

    /// Current draw state
    pub fn state(&self) -> EventState {
        if self.drawn { EventState::Drawn } else { EventState::Open }
    }

    /// Look up a participant of this event
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Participant IDs in insertion order
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    /// Store an assignment and mark the event drawn.
    ///
    /// The assignment must cover exactly this event's participants. Nothing
    /// is modified when it does not.
    ///
    /// # Errors
    ///
    /// - `PartialDraw` if a participant has no allocation
    /// - `StrayAllocation` if the assignment names someone outside the event
    pub fn apply_assignment(&mut self, assignment: &Assignment) -> Result<(), InvariantViolation> {
        if let Some(missing) = self.participants.iter().find(|p| assignment.get(p.id).is_none()) {
            return Err(InvariantViolation::PartialDraw { participant: missing.id });
        }
        if let Some((stray, _)) =
            assignment.iter().find(|(giver, _)| self.participant(*giver).is_none())
        {
            return Err(InvariantViolation::StrayAllocation { participant: stray });
        }

        for participant in &mut self.participants {
            if let Some(allocation) = assignment.get(participant.id) {
                participant.credential = Some(allocation.credential.clone());
                participant.recipient = Some(allocation.recipient);
            }
        }
        self.drawn = true;
        Ok(())
    }

    /// Discard all credentials and recipients and mark the event undrawn.
    pub fn clear_assignment(&mut self) {
        for participant in &mut self.participants {
            participant.credential = None;
            participant.recipient = None;
        }
        self.drawn = false;
    }

    /// Verify the drawn/undrawn invariant and the derangement property.
    ///
    /// # Errors
    ///
    /// Returns the first breach found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !self.drawn {
            return match self
                .participants
                .iter()
                .find(|p| p.credential.is_some() || p.recipient.is_some())
            {
                Some(p) => Err(InvariantViolation::StrayAllocation { participant: p.id }),
                None => Ok(()),
            };
        }

        let members: BTreeSet<ParticipantId> = self.participants.iter().map(|p| p.id).collect();
        let mut recipients = BTreeSet::new();

        for participant in &self.participants {
            let (Some(_), Some(recipient)) = (&participant.credential, participant.recipient)
            else {
                return Err(InvariantViolation::PartialDraw { participant: participant.id });
            };
            if recipient == participant.id {
                return Err(InvariantViolation::SelfAssignment { participant: participant.id });
            }
            if !members.contains(&recipient) {
                return Err(InvariantViolation::UnknownRecipient {
                    participant: participant.id,
                    recipient,
                });
            }
            if !recipients.insert(recipient) {
                return Err(InvariantViolation::DuplicateRecipient { recipient });
            }
        }

        Ok(())
    }
}

/// A breach of the drawn/undrawn invariant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Drawn event with a participant missing a credential or recipient
    #[error("participant {participant} has no allocation in a drawn event")]
    PartialDraw {
        /// Participant without an allocation
        participant: ParticipantId,
    },

    /// Undrawn event holding allocation data, or an allocation for a
    /// non-member
    #[error("participant {participant} holds an allocation outside a draw")]
    StrayAllocation {
        /// Offending participant
        participant: ParticipantId,
    },

    /// Participant assigned to themselves
    #[error("participant {participant} is assigned to themselves")]
    SelfAssignment {
        /// Offending participant
        participant: ParticipantId,
    },

    /// Recipient is not a member of the event
    #[error("participant {participant} gives to non-member {recipient}")]
    UnknownRecipient {
        /// Giver
        participant: ParticipantId,
        /// Recipient outside the event
        recipient: ParticipantId,
    },

    /// Two givers share a recipient
    #[error("recipient {recipient} is assigned more than once")]
    DuplicateRecipient {
        /// Recipient with several givers
        recipient: ParticipantId,
    },
}

/// One entry of the reveal-flow name picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantOption {
    /// Participant identity
    pub participant_id: ParticipantId,
    /// Participant display name
    pub name: String,
    /// Owning event
    pub event_id: EventId,
    /// Owning event's display name
    pub event_name: String,
    /// Whether the owning event is drawn
    pub event_drawn: bool,
}

/// Result of a successful reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revelation {
    /// Event the participant belongs to
    pub event_name: String,
    /// Display name of the participant's recipient
    pub recipient_name: String,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::assignment::generate_assignment;

    fn event_with(n: u128) -> Event {
        let mut event = Event::new(EventId::from(1), "Holiday", 0);
        for i in 0..n {
            event.participants.push(Participant::new(ParticipantId::from(100 + i), "p"));
        }
        event
    }

    #[test]
    fn ids_render_as_32_hex_digits() {
        let id = EventId::from(0xbeef);
        assert_eq!(id.to_string(), format!("{}{}", "0".repeat(28), "beef"));
        assert_eq!(EventId::from_hex(&id.to_string()), Some(id));
        assert_eq!(ParticipantId::from_hex("BEEF"), Some(ParticipantId::from(0xbeef)));
    }

    #[test]
    fn from_hex_rejects_malformed_input() {
        assert_eq!(EventId::from_hex(""), None);
        assert_eq!(EventId::from_hex("+1"), None);
        assert_eq!(EventId::from_hex("xyz"), None);
        assert_eq!(EventId::from_hex(&"f".repeat(33)), None);
    }

    #[test]
    fn generated_credentials_are_six_lowercase_letters() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..100 {
            let credential = Credential::generate(&mut rng);
            assert_eq!(credential.as_str().len(), CREDENTIAL_LEN);
            assert!(credential.as_str().bytes().all(|b| b.is_ascii_lowercase()));
        }
    }

    #[test]
    fn credential_match_is_exact() {
        let credential = Credential::new("qwerty");
        assert!(credential.matches("qwerty"));
        assert!(!credential.matches("QWERTY"));
        assert!(!credential.matches(" qwerty"));
        assert!(!credential.matches("qwert"));
        assert!(!credential.matches(""));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let debug = format!("{:?}", Credential::new("qwerty"));
        assert!(!debug.contains("qwerty"));
    }

    #[test]
    fn apply_then_clear_round_trips_through_invariants() {
        let mut event = event_with(4);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let assignment = generate_assignment(&event.participant_ids(), &mut rng).unwrap();

        event.apply_assignment(&assignment).unwrap();
        assert_eq!(event.state(), EventState::Drawn);
        event.check_invariants().unwrap();

        event.clear_assignment();
        assert_eq!(event.state(), EventState::Open);
        event.check_invariants().unwrap();
        assert!(event.participants.iter().all(|p| p.credential.is_none() && p.recipient.is_none()));
    }

    #[test]
    fn apply_rejects_assignment_missing_a_participant() {
        let mut event = event_with(3);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let assignment = generate_assignment(&event.participant_ids()[..2], &mut rng).unwrap();

        let before = event.clone();
        assert_eq!(
            event.apply_assignment(&assignment),
            Err(InvariantViolation::PartialDraw { participant: ParticipantId::from(102) })
        );
        assert_eq!(event, before);
    }

    #[test]
    fn invariants_catch_partial_and_self_assignment() {
        let mut event = event_with(2);
        event.drawn = true;
        assert!(matches!(event.check_invariants(), Err(InvariantViolation::PartialDraw { .. })));

        for p in &mut event.participants {
            p.credential = Some(Credential::new("abcdef"));
            p.recipient = Some(p.id);
        }
        assert!(matches!(event.check_invariants(), Err(InvariantViolation::SelfAssignment { .. })));

        event.drawn = false;
        assert!(matches!(
            event.check_invariants(),
            Err(InvariantViolation::StrayAllocation { .. })
        ));
    }

    #[test]
    fn invariants_catch_duplicate_recipient() {
        let mut event = event_with(3);
        event.drawn = true;
        let target = ParticipantId::from(102);
        // 100 -> 102, 101 -> 102, 102 -> 100
        for (i, p) in event.participants.iter_mut().enumerate() {
            p.credential = Some(Credential::new("abcdef"));
            p.recipient = Some(if i == 2 { ParticipantId::from(100) } else { target });
        }

        assert_eq!(
            event.check_invariants(),
            Err(InvariantViolation::DuplicateRecipient { recipient: target })
        );
    }
}
