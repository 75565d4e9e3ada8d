use thiserror::Error;

use critter_core::session::SessionIdError;
use critter_core::status::InvalidTransition;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request field.
    #[error("{0}")]
    Validation(String),

    #[error("invalid sessionId: {0}")]
    InvalidSession(#[from] SessionIdError),

    /// A hosted service has no credential configured.
    #[error("{0}")]
    NotConfigured(String),

    /// Upstream answered with a non-2xx status.
    #[error("{service} request failed with status {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Playback or local synthesis could not run.
    #[error("audio error: {0}")]
    Audio(String),

    /// A submission arrived while the bot was not idle.
    #[error("bot is busy ({0})")]
    Busy(critter_core::status::BotStatus),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("invalid reply pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("unknown persona: {0}")]
    UnknownPersona(String),
}

pub type Result<T> = std::result::Result<T, Error>;
