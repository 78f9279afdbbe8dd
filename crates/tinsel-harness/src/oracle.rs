//! Oracle functions for end-of-test verification.
//!
//! Oracles receive a snapshot of every stored event and check global
//! consistency. Tests run them after a sequence of operations, including
//! failed and concurrent ones, to show that no torn state was committed.

use std::collections::BTreeSet;

use tinsel_core::{
    Event, ParticipantId,
    constants::{CREDENTIAL_ALPHABET, CREDENTIAL_LEN},
    storage::Storage,
};

/// Oracle function type.
///
/// Receives the stored events and returns:
/// - `Ok(())` if all invariants hold
/// - `Err(message)` if verification fails
pub type OracleFn = Box<dyn FnOnce(&[Event]) -> Result<(), String>>;

/// Snapshot `storage` and run an oracle over it.
///
/// # Errors
///
/// Returns the oracle's message, or the storage error if the snapshot fails.
pub fn check(storage: &impl Storage, oracle: OracleFn) -> Result<(), String> {
    let events = storage.list_events().map_err(|e| format!("snapshot failed: {e}"))?;
    oracle(&events)
}

/// Every event is fully drawn or fully undrawn, and drawn events are
/// derangements.
pub fn invariants_hold() -> OracleFn {
    Box::new(|events: &[Event]| {
        for event in events {
            event.check_invariants().map_err(|e| format!("event {}: {e}", event.id))?;
        }
        Ok(())
    })
}

/// Every drawn event forms one gift cycle through all participants.
pub fn single_cycle() -> OracleFn {
    Box::new(|events: &[Event]| {
        for event in events.iter().filter(|e| e.drawn) {
            let Some(start) = event.participants.first() else {
                return Err(format!("event {} is drawn with no participants", event.id));
            };

            let mut visited = BTreeSet::new();
            let mut current = start.id;
            while visited.insert(current) {
                current = recipient(event, current)?;
            }
            if current != start.id || visited.len() != event.participants.len() {
                return Err(format!(
                    "event {}: cycle from {} covers {} of {} participants",
                    event.id,
                    start.id,
                    visited.len(),
                    event.participants.len()
                ));
            }
        }
        Ok(())
    })
}

/// Every issued credential is 6 lowercase letters.
pub fn credentials_well_formed() -> OracleFn {
    Box::new(|events: &[Event]| {
        for participant in events.iter().flat_map(|e| &e.participants) {
            if let Some(credential) = &participant.credential {
                let value = credential.as_str();
                if value.len() != CREDENTIAL_LEN
                    || !value.bytes().all(|b| CREDENTIAL_ALPHABET.contains(&b))
                {
                    let id = participant.id;
                    return Err(format!("participant {id} has a malformed credential"));
                }
            }
        }
        Ok(())
    })
}

/// Exactly `expected` events are drawn.
pub fn drawn_count(expected: usize) -> OracleFn {
    Box::new(move |events: &[Event]| {
        let actual = events.iter().filter(|e| e.drawn).count();
        if actual == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} drawn events, found {actual}"))
        }
    })
}

/// Combine multiple oracles into one.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |events: &[Event]| {
        for oracle in oracles {
            oracle(events)?;
        }
        Ok(())
    })
}

/// The standard set: invariants, single cycle, credential shape.
pub fn consistent() -> OracleFn {
    all_of(vec![invariants_hold(), single_cycle(), credentials_well_formed()])
}

fn recipient(event: &Event, giver: ParticipantId) -> Result<ParticipantId, String> {
    event
        .participant(giver)
        .and_then(|p| p.recipient)
        .ok_or_else(|| format!("event {}: participant {giver} has no recipient", event.id))
}
