//! Shared types for the critter chat server.
//!
//! Wire types for the HTTP API live here alongside the config structs, so the
//! CLI and any downstream client can speak the protocol without pulling in
//! tokio, axum or reqwest.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ─── Conversation types ────────────────────────────────────────────────────

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One line of the visible conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

/// A single transcript line, before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl LogEntry {
    /// Render as it is stored on disk: `[<ISO-8601>] <text>` and a blank line.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.text
        )
    }
}

// ─── HTTP wire types ───────────────────────────────────────────────────────

/// Body of `POST /api/log-message`. Both fields are optional on the wire so
/// the handler can answer a missing field with 400 instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /api/tts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice_id: String,
}

/// Successful `POST /api/transcribe` answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Body of `POST /api/reply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub persona: String,
    pub text: String,
}

/// Answer of `POST /api/reply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub reply: String,
    pub category: Option<crate::reply::Category>,
}

/// Owned form of a `GET /api/personas` entry, as read back by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaListing {
    pub slug: String,
    pub name: String,
    pub emoji: String,
    pub title: String,
    pub chat_available: bool,
}

/// `{ "error": "..." }`, the body of every non-2xx JSON answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `{ "success": true }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// `GET /health` answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub stt: bool,
    pub tts: bool,
}

// ─── Config ────────────────────────────────────────────────────────────────

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_ELEVENLABS_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_STT_MODEL: &str = "whisper-1";
pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";

/// Hosted transcription settings.
#[derive(Clone)]
pub struct SttConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Hosted speech synthesis settings.
#[derive(Clone)]
pub struct TtsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transcripts_dir: PathBuf,
    pub stt: SttConfig,
    pub tts: TtsConfig,
}

impl SttConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: DEFAULT_STT_MODEL.into(),
        }
    }
}

impl TtsConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_ELEVENLABS_URL.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: DEFAULT_TTS_MODEL.into(),
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transcripts_dir: PathBuf::from("transcriptions"),
            stt: SttConfig::new(None),
            tts: TtsConfig::new(None),
        }
    }
}

fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() { "[REDACTED]" } else { "<unset>" }
}

impl fmt::Debug for SttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SttConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("stability", &self.stability)
            .field("similarity_boost", &self.similarity_boost)
            .finish()
    }
}
