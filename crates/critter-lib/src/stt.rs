//! Speech-to-text — hosted transcription client.
//!
//! Posts a recorded clip to an OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint and returns the cleaned text.

use reqwest::multipart::{Form, Part};
use tracing::{debug, error};

use critter_core::text_prep::clean_transcript;
use critter_core::types::SttConfig;

use crate::error::{Error, Result};

/// An audio clip as received from a client.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    /// Best-effort MIME type from a file extension, `audio/webm` otherwise.
    pub fn mime_for(file_name: &str) -> &'static str {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "wav" => "audio/wav",
            "mp3" => "audio/mpeg",
            "ogg" | "oga" => "audio/ogg",
            "m4a" | "mp4" => "audio/mp4",
            "flac" => "audio/flac",
            _ => "audio/webm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SttClient {
    client: reqwest::Client,
    config: SttConfig,
}

impl SttClient {
    pub fn new(config: SttConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Whether a credential is configured.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::NotConfigured("OpenAI API key not configured".into()))?;

        let part = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime)
            .map_err(|e| Error::Validation(format!("invalid audio type {}: {e}", clip.mime)))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "json");

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("stt: POST {} bytes to {url}", clip.bytes.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("stt: transcription failed ({status}): {body}");
            return Err(Error::Upstream {
                service: "transcription",
                status: status.as_u16(),
                message: body,
            });
        }

        let value: serde_json::Value = resp.json().await?;
        let raw_text = value.get("text").and_then(|v| v.as_str()).unwrap_or("");
        Ok(clean_transcript(raw_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(AudioClip::mime_for("clip.WAV"), "audio/wav");
        assert_eq!(AudioClip::mime_for("recording.webm"), "audio/webm");
        assert_eq!(AudioClip::mime_for("noext"), "audio/webm");
        assert_eq!(AudioClip::mime_for("a.mp3"), "audio/mpeg");
    }

    #[tokio::test]
    async fn missing_key_is_config_error() {
        let client = SttClient::new(SttConfig::new(None));
        assert!(!client.is_configured());
        let clip = AudioClip::new(vec![0; 4], "a.webm", "audio/webm");
        match client.transcribe(&clip).await {
            Err(Error::NotConfigured(msg)) => assert!(msg.contains("not configured")),
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }
}
