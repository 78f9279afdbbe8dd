//! # Tinsel Protocol: Wire Format
//!
//! This crate implements the request/response framing used between the
//! Tinsel service and its callers (admin console, participant portal,
//! scripted clients).
//!
//! ## Protocol Design
//!
//! - **FrameHeader**: 16 bytes of raw binary (Big Endian), parsed zero-copy
//! - **Payload**: Variable-length CBOR-encoded request or response body
//!
//! The header carries the [`Opcode`] that identifies the payload type and a
//! caller-chosen request ID that the server echoes back, so a client can
//! pipeline several requests over one stream.
//!
//! ## Security Properties
//!
//! - **Size Limits**: Payloads are capped at 1 MiB before any CBOR parsing.
//! - **Secret Redaction**: Every payload that carries a passphrase or a
//!   credential implements `Debug` by hand and redacts the secret, so frames
//!   can be logged freely.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod header;
pub mod opcodes;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcodes::Opcode;
pub use payloads::{ErrorPayload, Payload};
