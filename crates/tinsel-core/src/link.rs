//! Shareable reveal links.
//!
//! After a draw the organizer hands each participant a link carrying their
//! participant ID and credential as query parameters:
//!
//! ```text
//! https://example.org/reveal?pid=<32 hex digits>&key=<credential>
//! ```

use thiserror::Error;

use crate::model::{Credential, ParticipantId};

/// Query parameter holding the participant ID
const PID_PARAM: &str = "pid";
/// Query parameter holding the credential
const KEY_PARAM: &str = "key";

/// Errors from parsing a reveal link
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A required query parameter is absent
    #[error("missing query parameter `{0}`")]
    MissingParameter(&'static str),

    /// `pid` is not 1 to 32 hex digits
    #[error("malformed participant id")]
    InvalidParticipantId,

    /// `key` is empty or not ASCII alphanumeric
    #[error("malformed credential")]
    InvalidCredential,
}

/// Participant ID and credential, as carried by a reveal link.
#[derive(Clone, PartialEq, Eq)]
pub struct RevealLink {
    /// Participant the link reveals for
    pub participant_id: ParticipantId,
    /// Credential issued at draw time
    pub credential: String,
}

impl RevealLink {
    /// Link for a participant and their issued credential
    pub fn new(participant_id: ParticipantId, credential: &Credential) -> Self {
        Self { participant_id, credential: credential.as_str().to_string() }
    }

    /// Render against a base URL.
    ///
    /// Appends with `&` when `base` already has a query string.
    pub fn to_url(&self, base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!(
            "{base}{separator}{PID_PARAM}={}&{KEY_PARAM}={}",
            self.participant_id, self.credential
        )
    }

    /// Parse a full URL or a bare query string.
    ///
    /// Unrelated parameters and any `#fragment` are ignored. When a
    /// parameter repeats, the first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns `LinkError` if `pid` or `key` is missing or malformed.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let without_fragment = input.split_once('#').map_or(input, |(before, _)| before);
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None => without_fragment,
        };

        let mut pid = None;
        let mut key = None;
        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            match name {
                PID_PARAM if pid.is_none() => pid = Some(value),
                KEY_PARAM if key.is_none() => key = Some(value),
                _ => {},
            }
        }

        let pid = pid.ok_or(LinkError::MissingParameter(PID_PARAM))?;
        let key = key.ok_or(LinkError::MissingParameter(KEY_PARAM))?;

        let participant_id =
            ParticipantId::from_hex(pid).ok_or(LinkError::InvalidParticipantId)?;
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LinkError::InvalidCredential);
        }

        Ok(Self { participant_id, credential: key.to_string() })
    }
}

impl std::fmt::Debug for RevealLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealLink")
            .field("participant_id", &self.participant_id)
            .field("credential", &"<redacted>")
            .finish()
    }
}
