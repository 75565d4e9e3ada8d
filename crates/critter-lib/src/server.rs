//! HTTP API for the critter chat server.
//!
//! Thin routes over the transcript log and the hosted STT/TTS clients, plus
//! read-only persona and terms endpoints. CORS-permissive so a browser front
//! end on another port can call it.

use std::sync::Arc;

use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use critter_core::persona::{self, Persona, PersonaSummary};
use critter_core::session::SessionId;
use critter_core::terms::{self, Terms};
use critter_core::text_prep::normalize_input;
use critter_core::types::{
    ErrorBody, HealthStatus, LogMessageRequest, ReplyRequest, ReplyResponse, ServerConfig,
    SuccessBody, TranscribeResponse, TtsRequest,
};

use crate::error::{Error, Result};
use crate::stt::{AudioClip, SttClient};
use crate::transcript::TranscriptLog;
use crate::tts::TtsClient;

/// Hosted transcription rejects uploads above 25 MB.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub struct ServerState {
    pub transcripts: TranscriptLog,
    pub stt: SttClient,
    pub tts: TtsClient,
}

pub type AppState = Arc<ServerState>;

impl ServerState {
    /// Build every component from `config`. Creates the transcripts directory.
    pub fn from_config(config: &ServerConfig) -> Result<AppState> {
        info!(
            "server state: transcripts={} stt={} tts={}",
            config.transcripts_dir.display(),
            config.stt.api_key.is_some(),
            config.tts.api_key.is_some()
        );
        Ok(Arc::new(Self {
            transcripts: TranscriptLog::open(&config.transcripts_dir)?,
            stt: SttClient::new(config.stt.clone()),
            tts: TtsClient::new(config.tts.clone()),
        }))
    }
}

/// Build the axum router around shared [`ServerState`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/log-message", post(log_message))
        .route("/api/tts", post(tts))
        .route("/api/transcribe", post(transcribe))
        .route("/api/reply", post(reply))
        .route("/api/personas", get(personas))
        .route("/api/personas/{slug}", get(persona_detail))
        .route("/api/terms", get(get_terms))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// Pass an upstream status through to the caller.
    Upstream(StatusCode, String),
    /// 500 with a specific message (configuration problems).
    Config(String),
    /// 500 with a fixed message.
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Upstream(status, msg) => (status, msg),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ─── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        ok: true,
        stt: state.stt.is_configured(),
        tts: state.tts.is_configured(),
    })
}

async fn log_message(
    State(state): State<AppState>,
    body: std::result::Result<Json<LogMessageRequest>, JsonRejection>,
) -> std::result::Result<Json<SuccessBody>, ApiError> {
    const REQUIRED: &str = "Text and sessionId are required";

    let Json(req) = body.map_err(|e| {
        warn!("log-message: rejected body: {e}");
        ApiError::BadRequest(REQUIRED.into())
    })?;

    let text = req.text.as_deref().filter(|t| !t.is_empty());
    let session = req.session_id.as_deref().filter(|s| !s.is_empty());
    let (Some(text), Some(session)) = (text, session) else {
        return Err(ApiError::BadRequest(REQUIRED.into()));
    };

    let session = SessionId::parse(session).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.transcripts.append(&session, text).await.map_err(|e| {
        error!("log-message: failed to append for {session}: {e}");
        ApiError::Internal("Internal Server Error")
    })?;

    Ok(Json(SuccessBody { success: true }))
}

async fn tts(
    State(state): State<AppState>,
    body: std::result::Result<Json<TtsRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    if !state.tts.is_configured() {
        return Err(ApiError::Config("ElevenLabs API key not configured".into()));
    }

    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if req.text.trim().is_empty() || req.voice_id.trim().is_empty() {
        return Err(ApiError::BadRequest("text and voiceId are required".into()));
    }

    match state.tts.synthesize(&req.text, &req.voice_id).await {
        Ok(audio) => {
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
        }
        Err(Error::Upstream { status, .. }) => Err(ApiError::Upstream(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            format!("ElevenLabs API request failed with status {status}"),
        )),
        Err(Error::NotConfigured(msg)) => Err(ApiError::Config(msg)),
        Err(e) => {
            error!("tts: ElevenLabs call failed: {e}");
            Err(ApiError::Internal("Internal Server Error"))
        }
    }
}

async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<TranscribeResponse>, ApiError> {
    let mut clip: Option<AudioClip> = None;
    let mut session: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("recording.webm").to_string();
                let mime = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| AudioClip::mime_for(&file_name).to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
                if !bytes.is_empty() {
                    clip = Some(AudioClip::new(bytes.to_vec(), file_name, mime));
                }
            }
            Some("sessionId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read sessionId: {e}")))?;
                session = Some(value);
            }
            _ => {}
        }
    }

    let Some(clip) = clip else {
        return Err(ApiError::BadRequest("No file found".into()));
    };
    let session = session
        .as_deref()
        .and_then(normalize_input)
        .ok_or_else(|| ApiError::BadRequest("sessionId is required".into()))?;
    let session = SessionId::parse(session).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let text = match state.stt.transcribe(&clip).await {
        Ok(text) => text,
        Err(Error::NotConfigured(msg)) => return Err(ApiError::Config(msg)),
        Err(e) => {
            error!("transcribe: {e}");
            return Err(ApiError::Internal("Error transcribing audio"));
        }
    };

    if !text.is_empty() {
        if let Err(e) = state.transcripts.append(&session, &text).await {
            error!("transcribe: failed to log transcription for {session}: {e}");
        }
    }

    Ok(Json(TranscribeResponse { text }))
}

async fn reply(
    body: std::result::Result<Json<ReplyRequest>, JsonRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!("reply: rejected body: {e}");
        ApiError::BadRequest(e.body_text())
    })?;
    let persona = persona::find(&req.persona)
        .ok_or_else(|| ApiError::NotFound(format!("unknown persona: {}", req.persona)))?;
    let selector = persona
        .selector()
        .ok_or_else(|| ApiError::BadRequest(format!("{} is not available for chat", persona.name)))?;
    let text =
        normalize_input(&req.text).ok_or_else(|| ApiError::BadRequest("text is required".into()))?;

    let selection = selector.select(text);
    Ok(Json(ReplyResponse {
        reply: selection.reply.to_string(),
        category: selection.category,
    }))
}

async fn personas() -> Json<Vec<PersonaSummary>> {
    Json(persona::all().iter().map(Persona::summary).collect())
}

async fn persona_detail(
    Path(slug): Path<String>,
) -> std::result::Result<Json<&'static Persona>, ApiError> {
    persona::find(&slug)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown persona: {slug}")))
}

async fn get_terms() -> Json<Terms> {
    Json(terms::terms())
}
