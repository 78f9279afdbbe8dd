//! Admin response payloads describing events and participants.

use serde::{Deserialize, Serialize};

/// A participant as seen by the organizer
///
/// `credential`, `recipient_id` and `reveal_link` are all present after a
/// draw and all absent before it. `Debug` redacts the credential and link.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// Participant ID
    pub participant_id: u128,
    /// Display name
    pub name: String,
    /// Credential issued at draw time
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub credential: Option<String>,
    /// Participant this one gives a gift to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recipient_id: Option<u128>,
    /// Shareable link that reveals this participant's recipient
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reveal_link: Option<String>,
}

impl std::fmt::Debug for ParticipantView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantView")
            .field("participant_id", &format_args!("{:032x}", self.participant_id))
            .field("name", &self.name)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("recipient_id", &self.recipient_id)
            .field("reveal_link", &self.reveal_link.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An event with its participants in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    /// Event ID
    pub event_id: u128,
    /// Display name
    pub name: String,
    /// Whether the draw has happened
    pub drawn: bool,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
    /// Participants in insertion order
    pub participants: Vec<ParticipantView>,
}

/// All events, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventList {
    /// Events in display order
    pub events: Vec<EventView>,
}

/// Response to `CreateEvent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCreated {
    /// ID of the new event
    pub event_id: u128,
}

/// Response to `AddParticipant`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantAdded {
    /// ID of the new participant
    pub participant_id: u128,
}
