//! Public payloads used by the participant reveal flow.
//!
//! These requests carry no admin passphrase. A participant picks their name
//! from [`ParticipantOptions`] and then sends a [`RevealRequest`] with the
//! credential issued at draw time.

use serde::{Deserialize, Serialize};

/// One selectable name in the reveal flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantOption {
    /// Participant ID
    pub participant_id: u128,
    /// Participant display name
    pub name: String,
    /// Event the participant belongs to
    pub event_id: u128,
    /// Event display name
    pub event_name: String,
    /// Whether the event has been drawn
    pub event_drawn: bool,
}

/// All selectable names, sorted by participant name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantOptions {
    /// Options in display order
    pub options: Vec<ParticipantOption>,
}

/// Ask for a participant's recipient
///
/// # Security
///
/// - **Debug Redaction**: `credential` is never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    /// Participant revealing their recipient
    pub participant_id: u128,
    /// Credential issued at draw time
    pub credential: String,
}

impl std::fmt::Debug for RevealRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealRequest")
            .field("participant_id", &format_args!("{:032x}", self.participant_id))
            .field("credential", &format_args!("<redacted {} chars>", self.credential.len()))
            .finish()
    }
}

/// Ask for a recipient with a shared reveal link
///
/// `link` is a full URL or a bare `pid=…&key=…` query string, as rendered
/// in [`ParticipantView::reveal_link`](crate::payloads::views::ParticipantView::reveal_link).
/// `Debug` never prints it, since it embeds the credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealByLink {
    /// Link handed out by the organizer
    pub link: String,
}

impl std::fmt::Debug for RevealByLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RevealByLink(<redacted>)")
    }
}

/// Successful reveal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revelation {
    /// Event display name
    pub event_name: String,
    /// Display name of the participant to give a gift to
    pub recipient_name: String,
}
