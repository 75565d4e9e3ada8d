//! Session identifiers.
//!
//! A session id names a transcript file and nothing else. Ids are generated
//! once per chat as `session_<tag>_<unix-millis>`; ids arriving over HTTP are
//! checked so they cannot escape the transcripts directory.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdError {
    Empty,
    TooLong(usize),
    LeadingDot,
    InvalidChar(char),
}

impl fmt::Display for SessionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "sessionId is empty"),
            Self::TooLong(n) => {
                write!(f, "sessionId is {n} bytes (max {MAX_SESSION_ID_LEN})")
            }
            Self::LeadingDot => write!(f, "sessionId must not start with '.'"),
            Self::InvalidChar(c) => write!(f, "sessionId contains invalid character {c:?}"),
        }
    }
}

impl std::error::Error for SessionIdError {}

impl SessionId {
    /// New id for a chat with the given persona tag.
    pub fn generate(tag: &str) -> Self {
        Self(format!("session_{tag}_{}", Utc::now().timestamp_millis()))
    }

    /// Validate an id received from a client.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong(raw.len()));
        }
        if raw.starts_with('.') {
            return Err(SessionIdError::LeadingDot);
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(SessionIdError::InvalidChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Transcript file name for this session.
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
