//! Text-to-speech — hosted synthesis client (ElevenLabs).
//!
//! The server's `/api/tts` route is a thin proxy over [`TtsClient::synthesize`];
//! the credential never leaves the server.

use serde::Serialize;
use tracing::{debug, error};

use critter_core::types::TtsConfig;

use crate::error::{Error, Result};

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Clone)]
pub struct TtsClient {
    client: reqwest::Client,
    config: TtsConfig,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Synthesize `text` with `voice_id`. Returns MP3 bytes.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::NotConfigured("ElevenLabs API key not configured".into()))?;

        let url = format!(
            "{}/v1/text-to-speech/{voice_id}",
            self.config.base_url.trim_end_matches('/')
        );
        let body = SynthesisRequest {
            text,
            model_id: &self.config.model,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        debug!("tts: POST {} chars to {url}", text.len());

        let resp = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("tts: ElevenLabs API error {status}: {body}");
            return Err(Error::Upstream {
                service: "ElevenLabs API",
                status: status.as_u16(),
                message: body,
            });
        }

        let audio = resp.bytes().await?;
        Ok(audio.to_vec())
    }
}
