//! Vendor proxy tests: validation limits and request/response mapping
//! against stub vendor servers.

use axum::{Json, Router, extract::Path, http::StatusCode, routing::post};
use base64ct::{Base64, Encoding};
use serde_json::json;

use ulpan::constants::MAX_PROXY_TEXT_LEN;
use ulpan::proxy::{
    DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE, DEFAULT_VOICE_ID, SpeechClient,
    SpeechRequest, TranslateClient, TranslateRequest,
};

use crate::helpers::spawn_stub_vendor;

fn speech_request(text: &str) -> SpeechRequest {
    SpeechRequest {
        text: text.to_string(),
        voice_id: None,
    }
}

fn translate_request(text: &str) -> TranslateRequest {
    TranslateRequest {
        text: text.to_string(),
        target_language: None,
        source_language: None,
    }
}

#[tokio::test]
async fn speech_rejects_invalid_text_before_any_vendor_call() {
    // Unroutable origin: a vendor call would fail loudly, not validate.
    let client = SpeechClient::new("http://127.0.0.1:1", "key");

    let err = client.synthesize(&speech_request("   ")).await.unwrap_err();
    assert!(err.is_validation_error());

    let long = "a".repeat(MAX_PROXY_TEXT_LEN + 1);
    let err = client.synthesize(&speech_request(&long)).await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn speech_returns_the_audio_as_a_data_url() {
    let router = Router::new().route(
        "/v1/text-to-speech/{voice_id}",
        post(|Path(voice_id): Path<String>| async move {
            assert_eq!(voice_id, DEFAULT_VOICE_ID);
            "MP3DATA".as_bytes().to_vec()
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = SpeechClient::new(&origin, "key");

    let synthesis = client.synthesize(&speech_request("שלום")).await.unwrap();

    let expected = format!(
        "data:audio/mpeg;base64,{}",
        Base64::encode_string(b"MP3DATA")
    );
    assert_eq!(synthesis.audio, expected);
    assert_eq!(synthesis.text, "שלום");
    assert_eq!(synthesis.voice_id, DEFAULT_VOICE_ID);
}

#[tokio::test]
async fn speech_honors_an_explicit_voice() {
    let router = Router::new().route(
        "/v1/text-to-speech/{voice_id}",
        post(|Path(voice_id): Path<String>| async move {
            assert_eq!(voice_id, "custom-voice");
            vec![0u8, 1, 2]
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = SpeechClient::new(&origin, "key");

    let synthesis = client
        .synthesize(&SpeechRequest {
            text: "hi".to_string(),
            voice_id: Some("custom-voice".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(synthesis.voice_id, "custom-voice");
}

#[tokio::test]
async fn speech_surfaces_vendor_failures() {
    let router = Router::new().route(
        "/v1/text-to-speech/{voice_id}",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = SpeechClient::new(&origin, "bad-key");

    let err = client.synthesize(&speech_request("hi")).await.unwrap_err();
    assert!(err.is_vendor_error());
}

#[tokio::test]
async fn translate_rejects_invalid_text_before_any_vendor_call() {
    let client = TranslateClient::new("http://127.0.0.1:1", "key");

    let err = client.translate(&translate_request("")).await.unwrap_err();
    assert!(err.is_validation_error());

    let long = "b".repeat(MAX_PROXY_TEXT_LEN + 1);
    let err = client.translate(&translate_request(&long)).await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn translate_maps_the_chat_completion_response() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            Json(json!({
                "choices": [{"message": {"content": "  שלום עולם \n"}}]
            }))
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = TranslateClient::new(&origin, "key");

    let translation = client
        .translate(&translate_request("Hello world"))
        .await
        .unwrap();

    assert_eq!(translation.translation, "שלום עולם");
    assert_eq!(translation.original, "Hello world");
    assert_eq!(translation.source_language, DEFAULT_SOURCE_LANGUAGE);
    assert_eq!(translation.target_language, DEFAULT_TARGET_LANGUAGE);
}

#[tokio::test]
async fn translate_surfaces_the_vendor_message() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"message": "Rate limit reached"}})),
            )
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = TranslateClient::new(&origin, "key");

    let err = client
        .translate(&translate_request("Hello"))
        .await
        .unwrap_err();

    assert!(err.is_vendor_error());
    assert!(err.to_string().contains("Rate limit reached"));
}

#[tokio::test]
async fn translate_rejects_an_empty_completion() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = TranslateClient::new(&origin, "key");

    let err = client
        .translate(&translate_request("Hello"))
        .await
        .unwrap_err();
    assert!(err.is_vendor_error());
}
