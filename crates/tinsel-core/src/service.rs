//! Request dispatcher.
//!
//! Maps decoded wire requests to coordinator calls and coordinator results
//! back to wire responses. Still Sans-IO: the server hands it frames and
//! writes back whatever it returns.
//!
//! Admin requests are checked against the [`AdminGate`] before any storage
//! access. `ListParticipantOptions`, `Reveal` and `RevealByLink` are public.

use tinsel_proto::{
    ErrorPayload, Frame, FrameHeader, Opcode, Payload, ProtocolError,
    payloads::{
        admin::Passphrase,
        reveal::{self, ParticipantOptions},
        views::{EventCreated, EventList, EventView, ParticipantAdded, ParticipantView},
    },
};
use tracing::{debug, warn};

use crate::{
    coordinator::EventCoordinator,
    env::Environment,
    error::ExchangeError,
    gate::AdminGate,
    link::RevealLink,
    model::{Event, EventId, ParticipantId, ParticipantOption, Revelation},
    storage::Storage,
};

/// Owns a coordinator, a storage handle and the admin gate.
pub struct Service<E, S>
where
    E: Environment,
    S: Storage,
{
    coordinator: EventCoordinator<E>,
    storage: S,
    gate: AdminGate,
    reveal_base: String,
}

impl<E, S> Service<E, S>
where
    E: Environment,
    S: Storage,
{
    /// Create a dispatcher
    ///
    /// Reveal links in admin views are rendered as bare query strings until
    /// a base URL is set with [`with_reveal_base`](Self::with_reveal_base).
    pub fn new(coordinator: EventCoordinator<E>, storage: S, gate: AdminGate) -> Self {
        Self { coordinator, storage, gate, reveal_base: String::new() }
    }

    /// Render reveal links against `base` (for example the public site URL)
    #[must_use]
    pub fn with_reveal_base(mut self, base: impl Into<String>) -> Self {
        self.reveal_base = base.into();
        self
    }

    /// Coordinator behind this service
    pub fn coordinator(&self) -> &EventCoordinator<E> {
        &self.coordinator
    }

    /// Storage behind this service
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Handle one request frame.
    ///
    /// The response carries the request's ID. A frame whose body does not
    /// decode gets a `BAD_REQUEST` error response rather than an `Err`, and a
    /// response too large for one frame is replaced by a `PAYLOAD_TOO_LARGE`
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::CborEncode` if the response cannot be encoded.
    pub fn handle_frame(&self, frame: &Frame) -> Result<Frame, ProtocolError> {
        let request_id = frame.header.request_id();

        let response = match Payload::from_frame(frame) {
            Ok(request) => self.handle(request),
            Err(err) => {
                warn!(request_id, error = %err, "Rejected malformed request");
                Payload::Error(ErrorPayload::new(ErrorPayload::BAD_REQUEST, err.to_string()))
            },
        };

        let mut header = FrameHeader::new(response.opcode());
        header.set_request_id(request_id);
        match response.into_frame(header) {
            Err(ProtocolError::PayloadTooLarge { size, max }) => {
                warn!(request_id, size, max, "Response exceeds frame limit");
                Payload::Error(ErrorPayload::new(
                    ErrorPayload::PAYLOAD_TOO_LARGE,
                    "response too large",
                ))
                .into_frame(header)
            },
            other => other,
        }
    }

    /// Handle one decoded request.
    pub fn handle(&self, request: Payload) -> Payload {
        let opcode = request.opcode();
        let coordinator = &self.coordinator;
        let storage = &self.storage;
        let view = |event: &Event| event_view(event, &self.reveal_base);

        let response = match request {
            Payload::FetchEvent(req) => self.admin(opcode, &req.passphrase, || {
                let event = coordinator.fetch_event(storage, EventId::from(req.event_id))?;
                Ok(Payload::EventDetail(view(&event)))
            }),
            Payload::ListEvents(req) => self.admin(opcode, &req.passphrase, || {
                let events = coordinator.list_events(storage)?.iter().map(view).collect();
                Ok(Payload::EventList(EventList { events }))
            }),
            Payload::CreateEvent(req) => self.admin(opcode, &req.passphrase, || {
                let event_id = coordinator.create_event(storage, &req.name)?;
                Ok(Payload::EventCreated(EventCreated { event_id: event_id.as_u128() }))
            }),
            Payload::DeleteEvent(req) => self.admin(opcode, &req.passphrase, || {
                coordinator.delete_event(storage, EventId::from(req.event_id))?;
                Ok(Payload::Ack)
            }),
            Payload::AddParticipant(req) => self.admin(opcode, &req.passphrase, || {
                let participant_id =
                    coordinator.add_participant(storage, EventId::from(req.event_id), &req.name)?;
                Ok(Payload::ParticipantAdded(ParticipantAdded {
                    participant_id: participant_id.as_u128(),
                }))
            }),
            Payload::RemoveParticipant(req) => self.admin(opcode, &req.passphrase, || {
                coordinator.remove_participant(storage, ParticipantId::from(req.participant_id))?;
                Ok(Payload::Ack)
            }),
            Payload::Draw(req) => self.admin(opcode, &req.passphrase, || {
                coordinator.draw(storage, EventId::from(req.event_id))?;
                Ok(Payload::Ack)
            }),
            Payload::Reset(req) => self.admin(opcode, &req.passphrase, || {
                coordinator.reset(storage, EventId::from(req.event_id))?;
                Ok(Payload::Ack)
            }),
            Payload::ListParticipantOptions => respond(
                coordinator.list_participant_options(storage).map(|options| {
                    Payload::ParticipantOptions(ParticipantOptions {
                        options: options.into_iter().map(option_view).collect(),
                    })
                }),
            ),
            Payload::Reveal(req) => respond(
                coordinator
                    .reveal(storage, ParticipantId::from(req.participant_id), &req.credential)
                    .map(revelation_view),
            ),
            Payload::RevealByLink(req) => {
                respond(coordinator.reveal_by_link(storage, &req.link).map(revelation_view))
            },
            Payload::Ack
            | Payload::Error(_)
            | Payload::EventDetail(_)
            | Payload::EventList(_)
            | Payload::ParticipantOptions(_)
            | Payload::EventCreated(_)
            | Payload::ParticipantAdded(_)
            | Payload::Revelation(_) => Payload::Error(ErrorPayload::new(
                ErrorPayload::BAD_REQUEST,
                format!("{opcode:?} is a response, not a request"),
            )),
        };

        debug!(?opcode, response = ?response.opcode(), "Handled request");
        response
    }

    fn admin(
        &self,
        opcode: Opcode,
        passphrase: &Passphrase,
        f: impl FnOnce() -> Result<Payload, ExchangeError>,
    ) -> Payload {
        if !self.gate.is_authorized(passphrase.expose()) {
            warn!(?opcode, "Rejected admin request with bad passphrase");
            return Payload::Error(ErrorPayload::new(ErrorPayload::UNAUTHORIZED, "unauthorized"));
        }
        respond(f())
    }
}

fn respond(result: Result<Payload, ExchangeError>) -> Payload {
    result.unwrap_or_else(|err| Payload::Error(error_payload(&err)))
}

/// Stable wire code and caller-safe message for an error.
///
/// Reveal denials all map to one code and one message. Storage details stay
/// in the logs.
pub fn error_payload(err: &ExchangeError) -> ErrorPayload {
    match err {
        ExchangeError::RevealDenied(_) => {
            ErrorPayload::new(ErrorPayload::REVEAL_DENIED, "reveal denied")
        },
        ExchangeError::EventNotFound(_) | ExchangeError::ParticipantNotFound(_) => {
            ErrorPayload::new(ErrorPayload::NOT_FOUND, err.to_string())
        },
        ExchangeError::AlreadyDrawn(_) | ExchangeError::EventAlreadyDrawn(_) => {
            ErrorPayload::new(ErrorPayload::CONFLICT, err.to_string())
        },
        ExchangeError::InvalidInput(_)
        | ExchangeError::InsufficientParticipants { .. }
        | ExchangeError::OddParticipantCount { .. }
        | ExchangeError::InvalidName(_) => {
            ErrorPayload::new(ErrorPayload::UNPROCESSABLE, err.to_string())
        },
        ExchangeError::Invariant(_) => ErrorPayload::new(ErrorPayload::INTERNAL, "internal error"),
        ExchangeError::StorageUnavailable(_) => {
            ErrorPayload::new(ErrorPayload::UNAVAILABLE, "storage unavailable")
        },
    }
}

/// Admin view of an event, including credentials, recipients and reveal
/// links rendered against `reveal_base`.
pub fn event_view(event: &Event, reveal_base: &str) -> EventView {
    EventView {
        event_id: event.id.as_u128(),
        name: event.name.clone(),
        drawn: event.drawn,
        created_at_ms: event.created_at_ms,
        participants: event
            .participants
            .iter()
            .map(|p| ParticipantView {
                participant_id: p.id.as_u128(),
                name: p.name.clone(),
                credential: p.credential.as_ref().map(|c| c.as_str().to_string()),
                recipient_id: p.recipient.map(ParticipantId::as_u128),
                reveal_link: p
                    .credential
                    .as_ref()
                    .map(|c| RevealLink::new(p.id, c).to_url(reveal_base)),
            })
            .collect(),
    }
}

fn revelation_view(revelation: Revelation) -> Payload {
    Payload::Revelation(reveal::Revelation {
        event_name: revelation.event_name,
        recipient_name: revelation.recipient_name,
    })
}

fn option_view(option: ParticipantOption) -> reveal::ParticipantOption {
    reveal::ParticipantOption {
        participant_id: option.participant_id.as_u128(),
        name: option.name,
        event_id: option.event_id.as_u128(),
        event_name: option.event_name,
        event_drawn: option.event_drawn,
    }
}

#[cfg(test)]
mod tests {
    use tinsel_proto::payloads::{
        admin::{AddParticipant, CreateEvent, Draw, FetchEvent},
        reveal::{RevealByLink, RevealRequest},
    };

    use super::*;
    use crate::{error::DenialReason, storage::MemoryStorage, test_support::TestEnv};

    const PASS: &str = "1q2w3e4r";

    fn service() -> Service<TestEnv, MemoryStorage> {
        Service::new(
            EventCoordinator::new(TestEnv::new(11)),
            MemoryStorage::new(),
            AdminGate::default(),
        )
    }

    fn create(service: &Service<TestEnv, MemoryStorage>, name: &str) -> u128 {
        match service.handle(Payload::CreateEvent(CreateEvent {
            passphrase: Passphrase::new(PASS),
            name: name.to_string(),
        })) {
            Payload::EventCreated(created) => created.event_id,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    fn add(service: &Service<TestEnv, MemoryStorage>, event_id: u128, name: &str) -> u128 {
        match service.handle(Payload::AddParticipant(AddParticipant {
            passphrase: Passphrase::new(PASS),
            event_id,
            name: name.to_string(),
        })) {
            Payload::ParticipantAdded(added) => added.participant_id,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    fn code(payload: &Payload) -> Option<u16> {
        match payload {
            Payload::Error(err) => Some(err.code),
            _ => None,
        }
    }

    #[test]
    fn admin_requests_need_the_passphrase() {
        let service = service();
        let response = service.handle(Payload::CreateEvent(CreateEvent {
            passphrase: Passphrase::new("guess"),
            name: "Holiday".to_string(),
        }));

        assert_eq!(code(&response), Some(ErrorPayload::UNAUTHORIZED));
        assert_eq!(service.storage().event_count(), Ok(0));
    }

    #[test]
    fn draw_and_reveal_through_requests() {
        let service = service();
        let event_id = create(&service, "Holiday");
        let ana = add(&service, event_id, "Ana");
        let bea = add(&service, event_id, "Bea");

        let drawn =
            service.handle(Payload::Draw(Draw { passphrase: Passphrase::new(PASS), event_id }));
        assert_eq!(drawn, Payload::Ack);

        let Payload::EventDetail(view) = service.handle(Payload::FetchEvent(FetchEvent {
            passphrase: Passphrase::new(PASS),
            event_id,
        })) else {
            panic!("expected event detail");
        };
        assert!(view.drawn);
        let ana_view = view.participants.iter().find(|p| p.participant_id == ana).unwrap();
        assert_eq!(ana_view.recipient_id, Some(bea));

        let response = service.handle(Payload::Reveal(RevealRequest {
            participant_id: ana,
            credential: ana_view.credential.clone().unwrap(),
        }));
        assert_eq!(
            response,
            Payload::Revelation(reveal::Revelation {
                event_name: "Holiday".to_string(),
                recipient_name: "Bea".to_string(),
            })
        );
    }

    #[test]
    fn reveal_denials_are_indistinguishable() {
        let service = service();
        let event_id = create(&service, "Holiday");
        let ana = add(&service, event_id, "Ana");

        let not_drawn = service.handle(Payload::Reveal(RevealRequest {
            participant_id: ana,
            credential: "abcdef".to_string(),
        }));
        let unknown = service.handle(Payload::Reveal(RevealRequest {
            participant_id: 1,
            credential: "abcdef".to_string(),
        }));

        assert_eq!(not_drawn, unknown);
        assert_eq!(code(&unknown), Some(ErrorPayload::REVEAL_DENIED));
        assert_eq!(
            error_payload(&ExchangeError::RevealDenied(DenialReason::CredentialMismatch)),
            ErrorPayload::new(ErrorPayload::REVEAL_DENIED, "reveal denied")
        );
    }

    #[test]
    fn odd_count_is_unprocessable() {
        let service = service();
        let event_id = create(&service, "Holiday");
        for name in ["Ana", "Bea", "Cy"] {
            add(&service, event_id, name);
        }

        let response =
            service.handle(Payload::Draw(Draw { passphrase: Passphrase::new(PASS), event_id }));
        assert_eq!(code(&response), Some(ErrorPayload::UNPROCESSABLE));
    }

    #[test]
    fn response_opcodes_are_not_requests() {
        let response = service().handle(Payload::Ack);
        assert_eq!(code(&response), Some(ErrorPayload::BAD_REQUEST));
    }

    #[test]
    fn storage_outage_maps_to_unavailable() {
        let service = service();
        service.storage().set_available(false);

        let response = service.handle(Payload::ListParticipantOptions);
        assert_eq!(
            response,
            Payload::Error(ErrorPayload::new(ErrorPayload::UNAVAILABLE, "storage unavailable"))
        );
    }

    #[test]
    fn frames_echo_request_id() {
        let service = service();
        let mut header = FrameHeader::new(Opcode::Ack);
        header.set_request_id(77);
        let request = Payload::ListParticipantOptions.into_frame(header).unwrap();

        let response = service.handle_frame(&request).unwrap();
        assert_eq!(response.header.request_id(), 77);
        assert_eq!(response.header.opcode_enum(), Some(Opcode::ParticipantOptions));
    }

    #[test]
    fn undecodable_body_is_bad_request() {
        let service = service();
        let mut header = FrameHeader::new(Opcode::Draw);
        header.set_request_id(5);
        let request = Frame::new(header, vec![0xff, 0x00]);

        let response = service.handle_frame(&request).unwrap();
        assert_eq!(response.header.request_id(), 5);
        assert_eq!(
            Payload::from_frame(&response).map(|p| code(&p)),
            Ok(Some(ErrorPayload::BAD_REQUEST))
        );
    }

    #[test]
    fn admin_view_links_reveal_the_recipient() {
        let service = service().with_reveal_base("https://gifts.example/");
        let event_id = create(&service, "Holiday");
        let ana = add(&service, event_id, "Ana");
        add(&service, event_id, "Bea");

        let Payload::EventDetail(before) = service.handle(Payload::FetchEvent(FetchEvent {
            passphrase: Passphrase::new(PASS),
            event_id,
        })) else {
            panic!("expected event detail");
        };
        assert!(before.participants.iter().all(|p| p.reveal_link.is_none()));

        service.handle(Payload::Draw(Draw { passphrase: Passphrase::new(PASS), event_id }));
        let Payload::EventDetail(view) = service.handle(Payload::FetchEvent(FetchEvent {
            passphrase: Passphrase::new(PASS),
            event_id,
        })) else {
            panic!("expected event detail");
        };
        let ana_view = view.participants.iter().find(|p| p.participant_id == ana).unwrap();
        let link = ana_view.reveal_link.clone().unwrap();
        assert_eq!(
            link,
            format!(
                "https://gifts.example/?pid={ana:032x}&key={}",
                ana_view.credential.as_deref().unwrap()
            )
        );

        let response = service.handle(Payload::RevealByLink(RevealByLink { link }));
        assert_eq!(
            response,
            Payload::Revelation(reveal::Revelation {
                event_name: "Holiday".to_string(),
                recipient_name: "Bea".to_string(),
            })
        );
    }

    #[test]
    fn malformed_link_is_denied_like_a_wrong_credential() {
        let service = service();
        let event_id = create(&service, "Holiday");
        let ana = add(&service, event_id, "Ana");

        let malformed = service.handle(Payload::RevealByLink(RevealByLink {
            link: "https://gifts.example/?key=abcdef".to_string(),
        }));
        let wrong = service.handle(Payload::Reveal(RevealRequest {
            participant_id: ana,
            credential: "abcdef".to_string(),
        }));

        assert_eq!(malformed, wrong);
        assert_eq!(code(&malformed), Some(ErrorPayload::REVEAL_DENIED));
    }

    #[test]
    fn oversized_response_becomes_an_error_frame() {
        let service = service();
        // 64 events of 64 participants with maximal names list past 1 MiB
        for e in 0..64 {
            let event_id = create(&service, &format!("{e:03}{}", "e".repeat(117)));
            for p in 0..64 {
                add(&service, event_id, &format!("{p:03}{}", "p".repeat(117)));
            }
        }

        let mut header = FrameHeader::new(Opcode::Ack);
        header.set_request_id(12);
        let request = Payload::ListParticipantOptions.into_frame(header).unwrap();

        let response = service.handle_frame(&request).unwrap();
        assert_eq!(response.header.request_id(), 12);
        assert!(response.payload.len() <= FrameHeader::MAX_PAYLOAD_SIZE as usize);
        assert_eq!(
            Payload::from_frame(&response),
            Ok(Payload::Error(ErrorPayload::new(
                ErrorPayload::PAYLOAD_TOO_LARGE,
                "response too large"
            )))
        );
    }
}
