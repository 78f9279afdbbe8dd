//! Operation codes for Tinsel frames.
//!
//! # Opcode Ranges
//!
//! - `0x0100-0x01FF`: Queries (read-only)
//! - `0x0200-0x02FF`: Membership (event and participant CRUD)
//! - `0x0300-0x03FF`: Draw lifecycle (draw, reset)
//! - `0x0400-0x04FF`: Reveal
//! - `0x8000-0xFFFF`: Responses (high bit set)
//!
//! A response opcode mirrors the range of the request it answers, so
//! `Revelation` (`0x8400`) answers `Reveal` (`0x0400`).

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Frame operation codes
///
/// # Representation
///
/// Opcodes are serialized as Big Endian `u16` values in the frame header.
/// The `#[repr(u16)]` ensures stable numeric values for wire compatibility.
///
/// Unknown values are never mapped to a default: `from_u16` returns `None`
/// and the frame must be rejected with
/// [`ProtocolError::InvalidOpcode`](crate::ProtocolError::InvalidOpcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum Opcode {
    // Queries (0x0100-0x01FF)
    /// Fetch one event with its participants
    FetchEvent = 0x0100,
    /// List every event with its participants
    ListEvents = 0x0101,
    /// List participant names for the reveal flow
    ListParticipantOptions = 0x0102,

    // Membership (0x0200-0x02FF)
    /// Create an empty event
    CreateEvent = 0x0200,
    /// Delete an event and its participants
    DeleteEvent = 0x0201,
    /// Register a participant in an event
    AddParticipant = 0x0202,
    /// Remove a participant from its event
    RemoveParticipant = 0x0203,

    // Draw lifecycle (0x0300-0x03FF)
    /// Run the draw for an event
    Draw = 0x0300,
    /// Discard an event's draw
    Reset = 0x0301,

    // Reveal (0x0400-0x04FF)
    /// Reveal a participant's recipient
    Reveal = 0x0400,
    /// Reveal through a shared link
    RevealByLink = 0x0401,

    // Responses (0x8000-0xFFFF)
    /// Request succeeded with no body
    Ack = 0x8000,
    /// Error response
    Error = 0x80FF,
    /// Single event
    EventDetail = 0x8100,
    /// All events
    EventList = 0x8101,
    /// Participant options
    ParticipantOptions = 0x8102,
    /// Event created
    EventCreated = 0x8200,
    /// Participant added
    ParticipantAdded = 0x8202,
    /// Reveal succeeded
    Revelation = 0x8400,
}

impl Opcode {
    /// Bit that marks a response opcode
    pub const RESPONSE_BIT: u16 = 0x8000;

    /// Convert to raw u16 value
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Convert from raw u16 value
    ///
    /// Returns `None` if the value doesn't correspond to a known opcode.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0100 => Some(Self::FetchEvent),
            0x0101 => Some(Self::ListEvents),
            0x0102 => Some(Self::ListParticipantOptions),

            0x0200 => Some(Self::CreateEvent),
            0x0201 => Some(Self::DeleteEvent),
            0x0202 => Some(Self::AddParticipant),
            0x0203 => Some(Self::RemoveParticipant),

            0x0300 => Some(Self::Draw),
            0x0301 => Some(Self::Reset),

            0x0400 => Some(Self::Reveal),
            0x0401 => Some(Self::RevealByLink),

            0x8000 => Some(Self::Ack),
            0x80FF => Some(Self::Error),
            0x8100 => Some(Self::EventDetail),
            0x8101 => Some(Self::EventList),
            0x8102 => Some(Self::ParticipantOptions),
            0x8200 => Some(Self::EventCreated),
            0x8202 => Some(Self::ParticipantAdded),
            0x8400 => Some(Self::Revelation),

            _ => None,
        }
    }

    /// Returns true for opcodes sent by the server
    #[must_use]
    pub const fn is_response(self) -> bool {
        self.to_u16() & Self::RESPONSE_BIT != 0
    }

    /// Returns true for requests that must carry the admin passphrase
    #[must_use]
    pub const fn requires_admin(self) -> bool {
        !self.is_response()
            && !matches!(self, Self::ListParticipantOptions | Self::Reveal | Self::RevealByLink)
    }
}
