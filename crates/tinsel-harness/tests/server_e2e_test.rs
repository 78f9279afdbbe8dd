//! End-to-end tests over a simulated network.
//!
//! A turmoil host runs the real connection loop from `tinsel-server` with a
//! seeded environment. The client speaks raw frames and checks:
//! - the full organizer flow (create → add → draw → fetch)
//! - the participant flow (list options → reveal, directly or by link)
//! - admin gating and reveal denial on the wire

use std::sync::Arc;

use tinsel_core::{EventCoordinator, Service, gate::AdminGate, storage::MemoryStorage};
use tinsel_harness::SimEnv;
use tinsel_proto::{
    ErrorPayload, Frame, FrameHeader, Opcode, Payload,
    payloads::{
        admin::{AddParticipant, CreateEvent, Draw, FetchEvent, Passphrase},
        reveal::{RevealByLink, RevealRequest},
    },
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use turmoil::net::{TcpListener, TcpStream};

type BoxError = Box<dyn std::error::Error>;

const PASSPHRASE: &str = "1q2w3e4r";

fn to_box_err<E: std::error::Error + 'static>(e: E) -> BoxError {
    Box::new(e)
}

fn start_server(sim: &mut turmoil::Sim<'_>, seed: u64) {
    sim.host("server", move || async move {
        let service = Arc::new(Service::new(
            EventCoordinator::new(SimEnv::with_seed(seed)),
            MemoryStorage::new(),
            AdminGate::default(),
        ));
        let listener = TcpListener::bind("0.0.0.0:443").await?;

        let (stream, _) = listener.accept().await?;
        tinsel_server::handle_connection(stream, service).await?;
        Ok(())
    });
}

/// Send one request and wait for its response
async fn request<T>(stream: &mut T, payload: Payload, request_id: u32) -> Result<Payload, BoxError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = FrameHeader::new(Opcode::Ack);
    header.set_request_id(request_id);
    let mut buf = Vec::new();
    payload.into_frame(header).map_err(to_box_err)?.encode(&mut buf).map_err(to_box_err)?;
    stream.write_all(&buf).await?;

    let mut header_buf = [0u8; FrameHeader::SIZE];
    stream.read_exact(&mut header_buf).await?;
    let header = *FrameHeader::from_bytes(&header_buf).map_err(to_box_err)?;
    assert_eq!(header.request_id(), request_id, "response must echo the request ID");

    let mut body = vec![0u8; header.payload_size() as usize];
    stream.read_exact(&mut body).await?;
    Payload::from_frame(&Frame::new(header, body)).map_err(to_box_err)
}

fn error_code(payload: &Payload) -> Option<u16> {
    match payload {
        Payload::Error(err) => Some(err.code),
        _ => None,
    }
}

#[test]
fn organizer_and_participant_flow() {
    let mut sim = turmoil::Builder::new().build();
    start_server(&mut sim, 42);

    sim.client("client", async {
        let mut stream = TcpStream::connect("server:443").await?;
        let passphrase = Passphrase::new(PASSPHRASE);

        let event_id = match request(
            &mut stream,
            Payload::CreateEvent(CreateEvent {
                passphrase: passphrase.clone(),
                name: "Holiday".to_string(),
            }),
            1,
        )
        .await?
        {
            Payload::EventCreated(created) => created.event_id,
            other => panic!("expected EventCreated, got {other:?}"),
        };

        for (i, name) in ["Alice", "Bob", "Carol", "Dave"].into_iter().enumerate() {
            let response = request(
                &mut stream,
                Payload::AddParticipant(AddParticipant {
                    passphrase: passphrase.clone(),
                    event_id,
                    name: name.to_string(),
                }),
                10 + i as u32,
            )
            .await?;
            assert!(matches!(response, Payload::ParticipantAdded(_)), "add {name}: {response:?}");
        }

        let response = request(
            &mut stream,
            Payload::Draw(Draw { passphrase: passphrase.clone(), event_id }),
            20,
        )
        .await?;
        assert_eq!(response, Payload::Ack);

        let event = match request(
            &mut stream,
            Payload::FetchEvent(FetchEvent { passphrase: passphrase.clone(), event_id }),
            21,
        )
        .await?
        {
            Payload::EventDetail(event) => event,
            other => panic!("expected EventDetail, got {other:?}"),
        };
        assert!(event.drawn);
        assert_eq!(event.participants.len(), 4);

        // Participant picks their name from the public list
        let options = match request(&mut stream, Payload::ListParticipantOptions, 30).await? {
            Payload::ParticipantOptions(options) => options.options,
            other => panic!("expected ParticipantOptions, got {other:?}"),
        };
        let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol", "Dave"]);
        assert!(options.iter().all(|o| o.event_drawn && o.event_id == event_id));

        let alice = &event.participants[0];
        let credential = alice.credential.clone().expect("drawn participant has a credential");
        let recipient_id = alice.recipient_id.expect("drawn participant has a recipient");
        let recipient_name = event
            .participants
            .iter()
            .find(|p| p.participant_id == recipient_id)
            .map(|p| p.name.clone())
            .expect("recipient is a participant");
        let link = alice.reveal_link.clone().expect("drawn participant has a reveal link");

        match request(
            &mut stream,
            Payload::Reveal(RevealRequest { participant_id: alice.participant_id, credential }),
            31,
        )
        .await?
        {
            Payload::Revelation(revelation) => {
                assert_eq!(revelation.event_name, "Holiday");
                assert_eq!(revelation.recipient_name, recipient_name);
                assert_ne!(revelation.recipient_name, "Alice");
            },
            other => panic!("expected Revelation, got {other:?}"),
        }

        // The shared link reveals the same recipient
        match request(&mut stream, Payload::RevealByLink(RevealByLink { link }), 33).await? {
            Payload::Revelation(revelation) => {
                assert_eq!(revelation.recipient_name, recipient_name);
            },
            other => panic!("expected Revelation, got {other:?}"),
        }
        let response = request(
            &mut stream,
            Payload::RevealByLink(RevealByLink { link: "?pid=not-hex&key=abcdef".to_string() }),
            34,
        )
        .await?;
        assert_eq!(error_code(&response), Some(ErrorPayload::REVEAL_DENIED));

        // A wrong credential is refused without saying why
        let response = request(
            &mut stream,
            Payload::Reveal(RevealRequest {
                participant_id: alice.participant_id,
                credential: "wrong".to_string(),
            }),
            32,
        )
        .await?;
        assert_eq!(error_code(&response), Some(ErrorPayload::REVEAL_DENIED));

        Ok(())
    });

    sim.run().expect("simulation should complete successfully");
}

#[test]
fn admin_requests_require_passphrase() {
    let mut sim = turmoil::Builder::new().build();
    start_server(&mut sim, 7);

    sim.client("client", async {
        let mut stream = TcpStream::connect("server:443").await?;

        let response = request(
            &mut stream,
            Payload::CreateEvent(CreateEvent {
                passphrase: Passphrase::new("guess"),
                name: "Holiday".to_string(),
            }),
            1,
        )
        .await?;
        assert_eq!(error_code(&response), Some(ErrorPayload::UNAUTHORIZED));

        // Nothing was created
        match request(&mut stream, Payload::ListParticipantOptions, 2).await? {
            Payload::ParticipantOptions(options) => assert!(options.options.is_empty()),
            other => panic!("expected ParticipantOptions, got {other:?}"),
        }

        Ok(())
    });

    sim.run().expect("simulation should complete successfully");
}

#[test]
fn draw_errors_travel_as_error_payloads() {
    let mut sim = turmoil::Builder::new().build();
    start_server(&mut sim, 9);

    sim.client("client", async {
        let mut stream = TcpStream::connect("server:443").await?;
        let passphrase = Passphrase::new(PASSPHRASE);

        let event_id = match request(
            &mut stream,
            Payload::CreateEvent(CreateEvent {
                passphrase: passphrase.clone(),
                name: "Office".to_string(),
            }),
            1,
        )
        .await?
        {
            Payload::EventCreated(created) => created.event_id,
            other => panic!("expected EventCreated, got {other:?}"),
        };

        // Empty event cannot be drawn
        let response = request(
            &mut stream,
            Payload::Draw(Draw { passphrase: passphrase.clone(), event_id }),
            2,
        )
        .await?;
        assert_eq!(error_code(&response), Some(ErrorPayload::UNPROCESSABLE));

        // Unknown event
        let response = request(
            &mut stream,
            Payload::Draw(Draw { passphrase, event_id: event_id.wrapping_add(1) }),
            3,
        )
        .await?;
        assert_eq!(error_code(&response), Some(ErrorPayload::NOT_FOUND));

        Ok(())
    });

    sim.run().expect("simulation should complete successfully");
}
