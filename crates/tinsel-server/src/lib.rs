//! Tinsel TCP server
//!
//! Thin async driver around the Sans-IO [`tinsel_core::Service`]. Each
//! connection carries a sequence of request frames; every request gets
//! exactly one response frame with the same request ID, in order.
//!
//! ```text
//! ┌────────┐  frame   ┌──────────────────┐  Payload  ┌─────────────┐
//! │ client │ ───────▶ │ handle_connection│ ────────▶ │ Service     │
//! │        │ ◀─────── │ (tokio)          │ ◀──────── │ (Sans-IO)   │
//! └────────┘  frame   └──────────────────┘           └─────────────┘
//! ```
//!
//! The stream type is generic, so the same loop runs over a real
//! `tokio::net::TcpStream` and a simulated `turmoil::net::TcpStream`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod system_env;

use std::{io, sync::Arc};

pub use config::{ConfigError, ServerConfig};
pub use system_env::SystemEnv;
use thiserror::Error;
use tinsel_core::{Service, env::Environment, storage::Storage};
use tinsel_proto::{Frame, FrameHeader, ProtocolError};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
};
use tracing::{debug, info, warn};

/// Errors that end a connection
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket failure
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Peer sent a frame that cannot be framed (bad magic, version or size)
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Serve request frames on one connection until the peer closes it.
///
/// A clean close between frames returns `Ok`. A frame whose header is
/// invalid ends the connection, since the stream cannot be resynchronized.
/// A frame whose body does not decode, or whose response would exceed the
/// frame limit, gets an error response and the connection stays open.
///
/// # Errors
///
/// Returns `ServerError` on socket failure or an invalid header.
pub async fn handle_connection<T, E, S>(
    mut stream: T,
    service: Arc<Service<E, S>>,
) -> Result<(), ServerError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    E: Environment,
    S: Storage,
{
    let mut header_buf = [0u8; FrameHeader::SIZE];

    loop {
        match stream.read_exact(&mut header_buf).await {
            Ok(_) => {},
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Peer closed connection");
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        }

        let header = match FrameHeader::from_bytes(&header_buf) {
            Ok(header) => *header,
            Err(e) => {
                warn!(error = %e, "Dropping connection after invalid frame header");
                return Err(e.into());
            },
        };

        let mut payload = vec![0u8; header.payload_size() as usize];
        stream.read_exact(&mut payload).await?;

        let response = service.handle_frame(&Frame::new(header, payload))?;

        let mut out = Vec::with_capacity(response.encoded_len());
        response.encode(&mut out)?;
        stream.write_all(&out).await?;
        stream.flush().await?;
    }
}

/// Accept connections forever, serving each on its own task.
///
/// # Errors
///
/// Returns the accept error if the listener fails.
pub async fn serve<E, S>(listener: TcpListener, service: Arc<Service<E, S>>) -> io::Result<()>
where
    E: Environment,
    S: Storage + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "Accepted connection");

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service).await {
                warn!(%peer, error = %e, "Connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use tinsel_core::{EventCoordinator, gate::AdminGate, storage::MemoryStorage};
    use tinsel_proto::{
        ErrorPayload, Opcode, Payload,
        payloads::admin::{CreateEvent, Passphrase},
    };

    use super::*;

    fn service() -> Arc<Service<SystemEnv, MemoryStorage>> {
        Arc::new(Service::new(
            EventCoordinator::new(SystemEnv),
            MemoryStorage::new(),
            AdminGate::default(),
        ))
    }

    async fn roundtrip<T: AsyncRead + AsyncWrite + Unpin>(
        stream: &mut T,
        request: Payload,
        request_id: u32,
    ) -> Frame {
        let mut header = FrameHeader::new(Opcode::Ack);
        header.set_request_id(request_id);
        let mut buf = Vec::new();
        request.into_frame(header).unwrap().encode(&mut buf).unwrap();
        stream.write_all(&buf).await.unwrap();

        let mut header_buf = [0u8; FrameHeader::SIZE];
        stream.read_exact(&mut header_buf).await.unwrap();
        let header = *FrameHeader::from_bytes(&header_buf).unwrap();
        let mut payload = vec![0u8; header.payload_size() as usize];
        stream.read_exact(&mut payload).await.unwrap();
        Frame::new(header, payload)
    }

    #[tokio::test]
    async fn serves_requests_in_order_on_one_connection() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(server, service()));

        let created = roundtrip(
            &mut client,
            Payload::CreateEvent(CreateEvent {
                passphrase: Passphrase::new("1q2w3e4r"),
                name: "Holiday".to_string(),
            }),
            1,
        )
        .await;
        assert_eq!(created.header.request_id(), 1);
        assert_eq!(created.header.opcode_enum(), Some(Opcode::EventCreated));

        let options = roundtrip(&mut client, Payload::ListParticipantOptions, 2).await;
        assert_eq!(options.header.request_id(), 2);
        assert!(matches!(
            Payload::from_frame(&options),
            Ok(Payload::ParticipantOptions(o)) if o.options.is_empty()
        ));

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn undecodable_body_keeps_connection_open() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(server, service()));

        let mut header = FrameHeader::new(Opcode::Draw);
        header.set_request_id(3);
        let mut buf = Vec::new();
        Frame::new(header, vec![0xff]).encode(&mut buf).unwrap();
        client.write_all(&buf).await.unwrap();

        let mut header_buf = [0u8; FrameHeader::SIZE];
        client.read_exact(&mut header_buf).await.unwrap();
        let header = *FrameHeader::from_bytes(&header_buf).unwrap();
        let mut payload = vec![0u8; header.payload_size() as usize];
        client.read_exact(&mut payload).await.unwrap();
        match Payload::from_frame(&Frame::new(header, payload)).unwrap() {
            Payload::Error(err) => assert_eq!(err.code, ErrorPayload::BAD_REQUEST),
            other => panic!("expected error, got {other:?}"),
        }

        // Still serving
        let response = roundtrip(&mut client, Payload::ListParticipantOptions, 4).await;
        assert_eq!(response.header.request_id(), 4);

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn oversized_listing_gets_error_reply_and_connection_stays_open() {
        let service = service();
        let coordinator = service.coordinator();
        for e in 0..64 {
            let event_id = coordinator
                .create_event(service.storage(), &format!("{e:03}{}", "e".repeat(117)))
                .unwrap();
            for p in 0..64 {
                coordinator
                    .add_participant(
                        service.storage(),
                        event_id,
                        &format!("{p:03}{}", "p".repeat(117)),
                    )
                    .unwrap();
            }
        }

        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(server, Arc::clone(&service)));

        let listing = roundtrip(&mut client, Payload::ListParticipantOptions, 1).await;
        assert_eq!(listing.header.request_id(), 1);
        match Payload::from_frame(&listing).unwrap() {
            Payload::Error(err) => assert_eq!(err.code, ErrorPayload::PAYLOAD_TOO_LARGE),
            other => panic!("expected error, got {other:?}"),
        }

        // Still serving
        let created = roundtrip(
            &mut client,
            Payload::CreateEvent(CreateEvent {
                passphrase: Passphrase::new("1q2w3e4r"),
                name: "Holiday".to_string(),
            }),
            2,
        )
        .await;
        assert_eq!(created.header.opcode_enum(), Some(Opcode::EventCreated));

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn invalid_header_ends_connection() {
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(handle_connection(server, service()));

        client.write_all(&[0u8; FrameHeader::SIZE]).await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::Protocol(ProtocolError::InvalidMagic))));
    }
}
