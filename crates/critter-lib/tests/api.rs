//! HTTP API integration tests

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use critter_lib::client::ApiClient;
use critter_lib::critter_core::session::SessionId;
use critter_lib::critter_core::types::{SttConfig, TtsConfig};
use critter_lib::stt::AudioClip;
use critter_lib::Error;

mod common;
use common::{
    body_json, fake_elevenlabs, fake_openai, fake_openai_failing, json_request, multipart_request, offline_router,
    spawn, test_router,
};

fn transcript_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir.join("transcriptions"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn transcript_lines(dir: &std::path::Path, session: &str) -> Vec<String> {
    let path = dir.join("transcriptions").join(format!("{session}.txt"));
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_health_reports_configured_services() {
    let (app, _dir) = offline_router();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "ok": true, "stt": false, "tts": false }));
}

#[tokio::test]
async fn test_log_message_twice_appends_two_lines() {
    let (app, dir) = offline_router();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/log-message",
                json!({ "text": "hi", "sessionId": "s1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    let lines = transcript_lines(dir.path(), "s1");
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with('[') && l.ends_with("] hi")));
    assert_ne!(lines[0], lines[1]);
}

#[tokio::test]
async fn test_log_message_without_session_is_rejected() {
    let (app, dir) = offline_router();
    let response = app
        .oneshot(json_request("POST", "/api/log-message", json!({ "text": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Text and sessionId are required" })
    );
    let entries = std::fs::read_dir(dir.path().join("transcriptions")).unwrap();
    assert_eq!(entries.count(), 0);
}

#[tokio::test]
async fn test_log_message_rejects_path_like_session() {
    let (app, _dir) = offline_router();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/log-message",
            json!({ "text": "hi", "sessionId": "../escape" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_log_message_malformed_json() {
    let (app, _dir) = offline_router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/log-message")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tts_without_key_is_config_error() {
    let (app, _dir) = offline_router();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/tts",
            json!({ "text": "hello", "voiceId": "NOpBlnGInO9m6vDvFkFC" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "ElevenLabs API key not configured" })
    );
}

#[tokio::test]
async fn test_tts_passes_upstream_status_through() {
    let upstream = fake_elevenlabs(StatusCode::UNAUTHORIZED).await;
    let mut tts = TtsConfig::new(Some("bad-key".into()));
    tts.base_url = upstream;
    let (app, _dir) = test_router(SttConfig::new(None), tts);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/tts",
            json!({ "text": "hello", "voiceId": "v1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "ElevenLabs API request failed with status 401" })
    );
}

#[tokio::test]
async fn test_tts_returns_audio() {
    let upstream = fake_elevenlabs(StatusCode::OK).await;
    let mut tts = TtsConfig::new(Some("key".into()));
    tts.base_url = upstream;
    let (app, _dir) = test_router(SttConfig::new(None), tts);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/tts",
            json!({ "text": "hello", "voiceId": "v1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..3], b"ID3");
}

#[tokio::test]
async fn test_transcribe_without_file_never_calls_upstream() {
    let (upstream, hits) = fake_openai("hello").await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, _dir) = test_router(stt, TtsConfig::new(None));

    let response = app
        .oneshot(multipart_request(None, Some("s1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No file found" }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transcribe_without_session_never_calls_upstream() {
    let (upstream, hits) = fake_openai("hello").await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, _dir) = test_router(stt, TtsConfig::new(None));

    let response = app
        .oneshot(multipart_request(Some(("a.webm", &b"RIFF"[..])), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transcribe_logs_cleaned_text() {
    let (upstream, hits) = fake_openai("[BLANK_AUDIO] I feel tired ").await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, dir) = test_router(stt, TtsConfig::new(None));

    let response = app
        .oneshot(multipart_request(Some(("recording.webm", &b"webm-bytes"[..])), Some("voice1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "text": "I feel tired" }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let lines = transcript_lines(dir.path(), "voice1");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("] I feel tired"));
}

#[tokio::test]
async fn test_transcribe_without_key_is_config_error() {
    let (app, dir) = offline_router();
    let response = app
        .oneshot(multipart_request(Some(("a.webm", &b"data"[..])), Some("s1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "OpenAI API key not configured" })
    );
    assert_eq!(transcript_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transcribe_upstream_failure_leaves_log_untouched() {
    let (upstream, hits) = fake_openai_failing(StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, dir) = test_router(stt, TtsConfig::new(None));

    let response = app
        .oneshot(multipart_request(Some(("recording.webm", &b"webm-bytes"[..])), Some("voice2")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Error transcribing audio" })
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(transcript_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transcribe_blank_result_is_not_logged() {
    let (upstream, _hits) = fake_openai("[BLANK_AUDIO]").await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, dir) = test_router(stt, TtsConfig::new(None));

    let response = app
        .oneshot(multipart_request(Some(("quiet.webm", &b"webm-bytes"[..])), Some("voice3")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "text": "" }));
    assert!(transcript_lines(dir.path(), "voice3").is_empty());
}

#[tokio::test]
async fn test_reply_malformed_json_is_bad_request() {
    let (app, _dir) = offline_router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/reply")
        .header("content-type", "application/json")
        .body(Body::from("{\"persona\": \"panda\""))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_reply_missing_field_is_bad_request() {
    let (app, _dir) = offline_router();
    let response = app
        .oneshot(json_request("POST", "/api/reply", json!({ "persona": "panda" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_reply_endpoint() {
    let (app, _dir) = offline_router();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/reply",
            json!({ "persona": "Panda", "text": "I am so overwhelmed, thank you" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["category"], "distress");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/reply",
            json!({ "persona": "capybara", "text": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reply",
            json!({ "persona": "cat", "text": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_personas_and_terms() {
    let (app, _dir) = offline_router();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/personas").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 5);
    assert_eq!(list[0]["slug"], "panda");
    assert_eq!(list[1]["chatAvailable"], false);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/personas/elephant").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Elephant");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/personas/dragon").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(Request::builder().uri("/api/terms").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let terms = body_json(response).await;
    assert!(!terms["clauses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_client_round_trip_against_live_server() {
    let (upstream, _hits) = fake_openai("hello there").await;
    let mut stt = SttConfig::new(Some("key".into()));
    stt.base_url = upstream;
    let (app, dir) = test_router(stt, TtsConfig::new(None));
    let client = ApiClient::new(spawn(app).await);

    let health = client.health().await.unwrap();
    assert!(health.stt && !health.tts);
    assert_eq!(client.personas().await.unwrap().len(), 5);

    let session = SessionId::parse("client1").unwrap();
    client.log_message(&session, "typed").await.unwrap();
    let clip = AudioClip::new(b"webm".to_vec(), "recording.webm", "audio/webm");
    assert_eq!(client.transcribe(&clip, &session).await.unwrap(), "hello there");
    assert_eq!(transcript_lines(dir.path(), "client1").len(), 2);

    match client.tts("hello", "v1").await {
        Err(Error::Upstream { status, message, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "ElevenLabs API key not configured");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}
