//! Assignment generator.
//!
//! Turns a list of participant IDs into a derangement plus one credential per
//! participant. Pure: no storage, no clock, and the only randomness is the
//! caller-supplied [`Rng`].
//!
//! # Algorithm
//!
//! 1. Copy the input and shuffle it with an unbiased Fisher-Yates pass (for
//!    `i` from `N-1` down to `1`, swap position `i` with a uniform `j` in
//!    `[0, i]`).
//! 2. The participant at shuffled position `i` gives to the one at
//!    `(i + 1) mod N`.
//!
//! The result is always a single N-cycle: a bijection with no fixed point in
//! which following recipients from anyone visits every participant.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::{
    constants::MIN_PARTICIPANTS,
    error::ExchangeError,
    model::{Credential, ParticipantId},
};

/// What one participant receives from a draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Who they give to
    pub recipient: ParticipantId,
    /// Their reveal credential
    pub credential: Credential,
}

/// Output of one draw, keyed by giver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    allocations: BTreeMap<ParticipantId, Allocation>,
}

impl Assignment {
    /// Allocation of a giver
    pub fn get(&self, giver: ParticipantId) -> Option<&Allocation> {
        self.allocations.get(&giver)
    }

    /// Recipient of a giver
    pub fn recipient_of(&self, giver: ParticipantId) -> Option<ParticipantId> {
        self.get(giver).map(|a| a.recipient)
    }

    /// Number of givers
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// True if nobody is allocated
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Givers and their allocations, ordered by giver ID
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &Allocation)> {
        self.allocations.iter().map(|(giver, allocation)| (*giver, allocation))
    }

    /// Length of the gift cycle starting at `start`.
    ///
    /// Returns `None` if `start` is not a giver or the chain leaves the
    /// assignment before returning.
    pub fn cycle_len(&self, start: ParticipantId) -> Option<usize> {
        let mut current = self.recipient_of(start)?;
        let mut len = 1;
        while current != start {
            if len > self.len() {
                return None;
            }
            current = self.recipient_of(current)?;
            len += 1;
        }
        Some(len)
    }
}

/// Generate a single-cycle derangement and fresh credentials.
///
/// The input is not modified. The same `rng` state always produces the same
/// assignment.
///
/// # Errors
///
/// `InvalidInput` if fewer than two IDs are given or an ID repeats.
pub fn generate_assignment<R: Rng + ?Sized>(
    participants: &[ParticipantId],
    rng: &mut R,
) -> Result<Assignment, ExchangeError> {
    let n = participants.len();
    if n < MIN_PARTICIPANTS {
        return Err(ExchangeError::InvalidInput(format!(
            "need at least {MIN_PARTICIPANTS} participants, got {n}"
        )));
    }

    let unique: BTreeSet<_> = participants.iter().collect();
    if unique.len() != n {
        return Err(ExchangeError::InvalidInput("duplicate participant id".to_string()));
    }

    let mut order = participants.to_vec();
    for i in (1..n).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }

    let allocations = order
        .iter()
        .enumerate()
        .map(|(i, giver)| {
            let recipient = order[(i + 1) % n];
            let allocation = Allocation { recipient, credential: Credential::generate(&mut *rng) };
            (*giver, allocation)
        })
        .collect();

    Ok(Assignment { allocations })
}
