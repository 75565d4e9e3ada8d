//! HTTP client for a running critter server.
//!
//! Used by the terminal chat and the CLI subcommands.

use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tracing::debug;

use critter_core::session::SessionId;
use critter_core::types::{
    ErrorBody, HealthStatus, LogMessageRequest, PersonaListing, TranscribeResponse, TtsRequest,
};

use crate::chat::ChatBackend;
use crate::error::{Error, Result};
use crate::speech::HostedTts;
use crate::stt::AudioClip;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let resp = self.client.get(format!("{}/health", self.base)).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn personas(&self) -> Result<Vec<PersonaListing>> {
        let resp = self
            .client
            .get(format!("{}/api/personas", self.base))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn log_message(&self, session: &SessionId, text: &str) -> Result<()> {
        let body = LogMessageRequest {
            text: Some(text.to_string()),
            session_id: Some(session.to_string()),
        };
        let resp = self
            .client
            .post(format!("{}/api/log-message", self.base))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Hosted synthesis through the server. Returns MP3 bytes.
    pub async fn tts(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let body = TtsRequest {
            text: text.to_string(),
            voice_id: voice_id.to_string(),
        };
        let resp = self
            .client
            .post(format!("{}/api/tts", self.base))
            .json(&body)
            .send()
            .await?;
        let audio = check(resp).await?.bytes().await?;
        debug!("client: received {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }

    pub async fn transcribe(&self, clip: &AudioClip, session: &SessionId) -> Result<String> {
        let part = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime)
            .map_err(|e| Error::Validation(format!("invalid audio type {}: {e}", clip.mime)))?;
        let form = Form::new()
            .part("file", part)
            .text("sessionId", session.to_string());

        let resp = self
            .client
            .post(format!("{}/api/transcribe", self.base))
            .multipart(form)
            .send()
            .await?;
        let body: TranscribeResponse = check(resp).await?.json().await?;
        Ok(body.text)
    }
}

impl HostedTts for ApiClient {
    async fn tts(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        ApiClient::tts(self, text, voice_id).await
    }
}

impl ChatBackend for ApiClient {
    async fn log_message(&self, session: &SessionId, text: &str) -> Result<()> {
        ApiClient::log_message(self, session, text).await
    }

    async fn transcribe(&self, clip: &AudioClip, session: &SessionId) -> Result<String> {
        ApiClient::transcribe(self, clip, session).await
    }
}

/// Turn a non-2xx response into [`Error::Upstream`], keeping the server's
/// `{ "error": ... }` message when there is one.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let raw = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&raw)
        .map(|b| b.error)
        .unwrap_or(raw);
    Err(Error::Upstream {
        service: "critter server",
        status: status.as_u16(),
        message,
    })
}
