//! Tinsel core logic
//!
//! This crate contains the pure logic of the Tinsel gift-exchange service:
//! the draw algorithm, the event state machine and the request dispatcher.
//! It performs no network I/O and never reads the clock or the OS entropy
//! pool directly.
//!
//! # Architecture
//!
//! ```text
//!      ┌──────────────────────────────────┐
//!      │ tinsel-core                      │
//!      │ - Assignment generator           │
//!      │ - Event state coordinator        │
//!      │ - Request dispatcher (Service)   │
//!      └──────────────────────────────────┘
//!         ↓                        ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │ tinsel-harness   │  │ tinsel-server    │
//! │ - Seeded RNG     │  │ - OS entropy     │
//! │ - Manual clock   │  │ - System clock   │
//! │ - Oracles        │  │ - Tokio TCP      │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in Core: time and randomness come from the [`env::Environment`]
//!   trait, persistence from the [`storage::Storage`] trait
//! - Atomic transitions: draw, reset and membership changes are each a single
//!   [`storage::Storage::update_event`] transaction
//! - Deterministic: given the same environment seed, the same requests
//!   produce the same assignment
//!
//! # Modules
//!
//! - [`assignment`]: Assignment generator (shuffle, cycle, credentials)
//! - [`coordinator`]: Event state coordinator (draw, reset, reveal, membership)
//! - [`model`]: Events, participants, credentials and their invariants
//! - [`storage`]: Datastore abstraction and in-memory implementation
//! - [`service`]: Maps wire requests to coordinator calls
//! - [`gate`]: Admin passphrase check
//! - [`link`]: Shareable reveal links
//! - [`env`]: Environment abstraction (time, RNG)
//! - [`error`]: Error taxonomy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod assignment;
pub mod constants;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod gate;
pub mod link;
pub mod model;
pub mod service;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use assignment::{Allocation, Assignment, generate_assignment};
pub use coordinator::{DrawPolicy, EventCoordinator};
pub use error::{DenialReason, ExchangeError};
pub use model::{Credential, Event, EventId, EventState, Participant, ParticipantId};
pub use service::Service;
