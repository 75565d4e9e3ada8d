//! Shared test utilities

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use critter_lib::critter_core::types::{ServerConfig, SttConfig, TtsConfig};
use critter_lib::server::{self, ServerState};
use tempfile::TempDir;

pub const BOUNDARY: &str = "critter-test-boundary";

/// Router over a fresh transcripts directory. Keep the `TempDir` alive.
pub fn test_router(stt: SttConfig, tts: TtsConfig) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = ServerConfig {
        transcripts_dir: dir.path().join("transcriptions"),
        stt,
        tts,
    };
    let state = ServerState::from_config(&config).expect("failed to build state");
    (server::router(state), dir)
}

/// Router with no upstream credentials.
pub fn offline_router() -> (Router, TempDir) {
    test_router(SttConfig::new(None), TtsConfig::new(None))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

/// `multipart/form-data` request; `file` is `(file name, bytes)`.
pub fn multipart_request(file: Option<(&str, &[u8])>, session: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(session) = session {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"sessionId\"\r\n\r\n{session}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("failed to build request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

/// Fake transcription service. Counts requests.
pub async fn fake_openai(text: &'static str) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/v1/audio/transcriptions",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({ "text": text }))
            }
        }),
    );
    (spawn(router).await, hits)
}

/// Fake OpenAI transcription endpoint that always fails with `status`.
pub async fn fake_openai_failing(status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/v1/audio/transcriptions",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (
                    status,
                    Json(serde_json::json!({ "error": { "message": "upstream exploded" } })),
                )
            }
        }),
    );
    (spawn(router).await, hits)
}

/// Fake ElevenLabs that always answers with `status`.
pub async fn fake_elevenlabs(status: StatusCode) -> String {
    let router = Router::new().route(
        "/v1/text-to-speech/{voice_id}",
        post(move || async move {
            if status.is_success() {
                (status, vec![0x49, 0x44, 0x33, 0x04])
            } else {
                (status, b"{\"detail\":\"nope\"}".to_vec())
            }
        }),
    );
    spawn(router).await
}
