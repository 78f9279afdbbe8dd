//! Deterministic test harness for the Tinsel gift-exchange service.
//!
//! This crate provides a seeded implementation of the `Environment` trait and
//! a set of invariant oracles, so draws can be replayed exactly and checked
//! against the drawn/undrawn contract after any sequence of operations.
//!
//! The integration tests under `tests/` drive the coordinator, the request
//! dispatcher and (through turmoil) the TCP server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod oracle;
pub mod sim_env;

pub use sim_env::SimEnv;
