//! Draw and naming limits.

/// Length of a participant credential
pub const CREDENTIAL_LEN: usize = 6;

/// Characters a credential is drawn from (uniformly)
pub const CREDENTIAL_ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Smallest participant count the generator accepts
pub const MIN_PARTICIPANTS: usize = 2;

/// Longest accepted event or participant name, in characters
pub const MAX_NAME_CHARS: usize = 120;
