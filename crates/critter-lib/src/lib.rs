//! critter-lib — Chat server engine.
//!
//! Transcript logging, hosted STT/TTS bridging, the HTTP API, and the
//! terminal chat session with spoken replies.
//! Depends on critter-core for pure types, personas and reply selection.

pub mod chat;
pub mod client;
pub mod error;
pub mod server;
pub mod speech;
pub mod status;
pub mod stt;
pub mod transcript;
pub mod tts;

pub use error::{Error, Result};

// Re-export critter-core for convenience
pub use critter_core;
