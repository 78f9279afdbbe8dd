//! CBOR-encoded frame payloads.
//!
//! Each opcode has a corresponding payload type. The `Payload` enum provides
//! type-safe payload handling with automatic CBOR serialization.
//!
//! The variant tag is never serialized: the frame header's opcode already
//! identifies the payload type, so a frame whose opcode and body disagree
//! fails to decode instead of being reinterpreted.

pub mod admin;
pub mod reveal;
pub mod views;

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// All possible frame payloads
///
/// # Invariants
///
/// - **Opcode Uniqueness**: Each variant corresponds to exactly one
///   [`Opcode`], returned by [`Payload::opcode`].
/// - **Exhaustive Matching**: `encode`, `decode` and `opcode` match every
///   variant, so a new variant cannot be left unhandled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Queries
    /// Fetch one event
    FetchEvent(admin::FetchEvent),
    /// List all events
    ListEvents(admin::ListEvents),
    /// List participant names for the reveal flow
    ListParticipantOptions,

    // Membership
    /// Create an event
    CreateEvent(admin::CreateEvent),
    /// Delete an event
    DeleteEvent(admin::DeleteEvent),
    /// Add a participant
    AddParticipant(admin::AddParticipant),
    /// Remove a participant
    RemoveParticipant(admin::RemoveParticipant),

    // Draw lifecycle
    /// Run the draw
    Draw(admin::Draw),
    /// Discard the draw
    Reset(admin::Reset),

    // Reveal
    /// Reveal a recipient
    Reveal(reveal::RevealRequest),
    /// Reveal a recipient from a shared link
    RevealByLink(reveal::RevealByLink),

    // Responses
    /// Success without a body
    Ack,
    /// Error response
    Error(ErrorPayload),
    /// One event
    EventDetail(views::EventView),
    /// All events
    EventList(views::EventList),
    /// Participant options
    ParticipantOptions(reveal::ParticipantOptions),
    /// Event created
    EventCreated(views::EventCreated),
    /// Participant added
    ParticipantAdded(views::ParticipantAdded),
    /// Reveal succeeded
    Revelation(reveal::Revelation),
}

/// Error payload for error frames
///
/// `message` is safe to show to the caller. It never contains storage
/// details, and for reveal failures it never says which part of the input
/// was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code (one of the associated constants)
    pub code: u16,
    /// Human-readable error message
    pub message: String,
}

impl ErrorPayload {
    /// Malformed request
    pub const BAD_REQUEST: u16 = 400;
    /// Missing or wrong admin passphrase
    pub const UNAUTHORIZED: u16 = 401;
    /// Reveal refused
    pub const REVEAL_DENIED: u16 = 403;
    /// Event or participant does not exist
    pub const NOT_FOUND: u16 = 404;
    /// Operation conflicts with the event's draw state
    pub const CONFLICT: u16 = 409;
    /// Response would not fit in one frame
    pub const PAYLOAD_TOO_LARGE: u16 = 413;
    /// Request is well-formed but violates a draw rule
    pub const UNPROCESSABLE: u16 = 422;
    /// Stored state is inconsistent
    pub const INTERNAL: u16 = 500;
    /// Datastore could not be reached
    pub const UNAVAILABLE: u16 = 503;

    /// Build an error payload
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

impl Payload {
    /// Get the opcode for this payload variant
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::FetchEvent(_) => Opcode::FetchEvent,
            Self::ListEvents(_) => Opcode::ListEvents,
            Self::ListParticipantOptions => Opcode::ListParticipantOptions,
            Self::CreateEvent(_) => Opcode::CreateEvent,
            Self::DeleteEvent(_) => Opcode::DeleteEvent,
            Self::AddParticipant(_) => Opcode::AddParticipant,
            Self::RemoveParticipant(_) => Opcode::RemoveParticipant,
            Self::Draw(_) => Opcode::Draw,
            Self::Reset(_) => Opcode::Reset,
            Self::Reveal(_) => Opcode::Reveal,
            Self::RevealByLink(_) => Opcode::RevealByLink,
            Self::Ack => Opcode::Ack,
            Self::Error(_) => Opcode::Error,
            Self::EventDetail(_) => Opcode::EventDetail,
            Self::EventList(_) => Opcode::EventList,
            Self::ParticipantOptions(_) => Opcode::ParticipantOptions,
            Self::EventCreated(_) => Opcode::EventCreated,
            Self::ParticipantAdded(_) => Opcode::ParticipantAdded,
            Self::Revelation(_) => Opcode::Revelation,
        }
    }

    /// Encode payload to buffer
    ///
    /// Serializes only the inner struct, NOT the variant tag. Unit variants
    /// encode to zero bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::FetchEvent(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ListEvents(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ListParticipantOptions | Self::Ack => Ok(()),
            Self::CreateEvent(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::DeleteEvent(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::AddParticipant(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::RemoveParticipant(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Draw(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Reset(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Reveal(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::RevealByLink(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::EventDetail(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::EventList(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ParticipantOptions(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::EventCreated(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ParticipantAdded(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Revelation(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode payload from bytes based on opcode
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `bytes.len() > MAX_PAYLOAD_SIZE`
    /// - CBOR deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::FetchEvent => Self::FetchEvent(from_cbor(bytes)?),
            Opcode::ListEvents => Self::ListEvents(from_cbor(bytes)?),
            Opcode::ListParticipantOptions => Self::ListParticipantOptions,
            Opcode::CreateEvent => Self::CreateEvent(from_cbor(bytes)?),
            Opcode::DeleteEvent => Self::DeleteEvent(from_cbor(bytes)?),
            Opcode::AddParticipant => Self::AddParticipant(from_cbor(bytes)?),
            Opcode::RemoveParticipant => Self::RemoveParticipant(from_cbor(bytes)?),
            Opcode::Draw => Self::Draw(from_cbor(bytes)?),
            Opcode::Reset => Self::Reset(from_cbor(bytes)?),
            Opcode::Reveal => Self::Reveal(from_cbor(bytes)?),
            Opcode::RevealByLink => Self::RevealByLink(from_cbor(bytes)?),
            Opcode::Ack => Self::Ack,
            Opcode::Error => Self::Error(from_cbor(bytes)?),
            Opcode::EventDetail => Self::EventDetail(from_cbor(bytes)?),
            Opcode::EventList => Self::EventList(from_cbor(bytes)?),
            Opcode::ParticipantOptions => Self::ParticipantOptions(from_cbor(bytes)?),
            Opcode::EventCreated => Self::EventCreated(from_cbor(bytes)?),
            Opcode::ParticipantAdded => Self::ParticipantAdded(from_cbor(bytes)?),
            Opcode::Revelation => Self::Revelation(from_cbor(bytes)?),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame
    ///
    /// Encodes the payload, sets the opcode in `header` and builds a frame
    /// with the matching payload size. The request ID already in `header` is
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::CborEncode` if serialization fails, or
    /// `ProtocolError::PayloadTooLarge` if the body exceeds
    /// [`FrameHeader::MAX_PAYLOAD_SIZE`].
    pub fn into_frame(self, mut header: FrameHeader) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        if buf.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: buf.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }
        header.opcode = self.opcode().to_u16().to_be_bytes();
        Ok(Frame::new(header, buf))
    }

    /// Parse payload from a raw transport frame
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Opcode is unknown
    /// - CBOR deserialization fails
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::InvalidOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}
