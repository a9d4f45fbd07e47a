//! Serve command - runs the Ulpan API server.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Json as ExtractJson, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use ulpan::{
    Clock, SystemClock,
    billing::{CheckoutClient, CheckoutRequest, WebhookVerifier, webhook},
    proxy::{SpeechClient, SpeechRequest, TranslateClient, TranslateRequest},
    store::{DocumentStore, InMemory},
};

use crate::cli::ServeArgs;

const STORE_FILE: &str = "ulpan.json";
const SIGNATURE_HEADER: &str = "stripe-signature";

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    checkout: Arc<CheckoutClient>,
    webhooks: Arc<WebhookVerifier>,
    speech: Arc<SpeechClient>,
    translate: Arc<TranslateClient>,
}

/// Checkout request body
#[derive(Deserialize)]
struct CheckoutBody {
    #[serde(default, rename = "priceId")]
    price_id: String,
    #[serde(default, rename = "userId")]
    user_id: String,
    email: Option<String>,
}

/// Speech request body
#[derive(Deserialize)]
struct SpeechBody {
    #[serde(default)]
    text: String,
    #[serde(rename = "voiceId")]
    voice_id: Option<String>,
}

/// Translation request body
#[derive(Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: String,
    #[serde(rename = "targetLanguage")]
    target_language: Option<String>,
    #[serde(rename = "sourceLanguage")]
    source_language: Option<String>,
}

/// Run the Ulpan API server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ulpan=info".parse()?))
        .init();

    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let store_path = data_dir.join(STORE_FILE);

    // Load or create the document store
    let store = match InMemory::load_from_file(&store_path) {
        Ok(store) => {
            tracing::info!("Loaded document store from {}", store_path.display());
            store
        }
        Err(e) => {
            tracing::warn!("Failed to load document store: {e:?}. Starting empty.");
            InMemory::new()
        }
    };
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let app_state = AppState {
        store,
        clock: Arc::new(SystemClock),
        checkout: Arc::new(CheckoutClient::new(
            args.payment_api_base.as_str(),
            &args.payment_secret_key,
            args.domain.as_str(),
        )),
        webhooks: Arc::new(WebhookVerifier::new(&args.payment_webhook_secret)),
        speech: Arc::new(SpeechClient::new(
            args.speech_api_base.as_str(),
            &args.speech_api_key,
        )),
        translate: Arc::new(TranslateClient::new(
            args.translate_api_base.as_str(),
            &args.translate_api_key,
        )),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/checkout", post(handle_checkout))
        .route("/api/webhooks", post(handle_webhook))
        .route("/api/speech", post(handle_speech))
        .route("/api/translate", post(handle_translate))
        .with_state(app_state.clone());

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    println!("Ulpan API server starting on http://localhost:{}", local_addr.port());
    println!();
    println!("Available endpoints:");
    println!("  GET  /health        - Health check");
    println!("  POST /api/checkout  - Create a subscription checkout session");
    println!("  POST /api/webhooks  - Payment vendor webhook deliveries");
    println!("  POST /api/speech    - Text-to-speech proxy");
    println!("  POST /api/translate - Translation proxy");
    println!();
    println!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to set up SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to set up SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
                _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
            }

            // Persist the document store on shutdown
            if let Some(in_memory) = app_state.store.as_any().downcast_ref::<InMemory>() {
                match in_memory.save_to_file(&store_path) {
                    Ok(_) => {
                        tracing::info!("Document store saved to {}", store_path.display());
                        println!("\nDocument store saved successfully");
                    }
                    Err(e) => {
                        tracing::error!("Failed to save document store: {e:?}");
                        eprintln!("Failed to save document store: {e:?}");
                    }
                }
            }
        })
        .await?;

    println!("Server shut down");
    Ok(())
}

/// Map a library error onto an HTTP error response.
///
/// Validation and signature failures are the caller's fault; vendor failures
/// surface as a bad gateway with the vendor's message.
fn error_response(err: &ulpan::Error) -> Response {
    let status = if err.is_validation_error() || err.is_signature_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_vendor_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Handler for GET /health
async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store_type = if state.store.as_any().is::<InMemory>() {
        "inmemory"
    } else {
        "unknown"
    };
    Json(json!({ "status": "healthy", "store": store_type }))
}

/// Handler for POST /api/checkout
async fn handle_checkout(
    State(state): State<AppState>,
    ExtractJson(body): ExtractJson<CheckoutBody>,
) -> Response {
    let request = CheckoutRequest {
        price_id: body.price_id,
        user_id: body.user_id,
        email: body.email,
    };
    match state.checkout.create_session(&request).await {
        Ok(session) => {
            Json(json!({ "url": session.url, "sessionId": session.id })).into_response()
        }
        Err(e) => {
            tracing::error!("checkout session creation failed: {e}");
            error_response(&e)
        }
    }
}

/// Handler for POST /api/webhooks
///
/// Takes the raw body: signature verification covers the exact payload
/// bytes, so the body must not pass through a JSON round trip first.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing signature header" })),
        )
            .into_response();
    };

    let event = match state.webhooks.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("webhook delivery rejected: {e}");
            return error_response(&e);
        }
    };

    match webhook::apply_event(state.store.as_ref(), state.clock.as_ref(), &event).await {
        Ok(_) => Json(json!({ "received": true })).into_response(),
        Err(e) => {
            tracing::error!("webhook processing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook processing failed" })),
            )
                .into_response()
        }
    }
}

/// Handler for POST /api/speech
async fn handle_speech(
    State(state): State<AppState>,
    ExtractJson(body): ExtractJson<SpeechBody>,
) -> Response {
    let request = SpeechRequest {
        text: body.text,
        voice_id: body.voice_id,
    };
    match state.speech.synthesize(&request).await {
        Ok(synthesis) => Json(synthesis).into_response(),
        Err(e) => {
            tracing::error!("speech synthesis failed: {e}");
            error_response(&e)
        }
    }
}

/// Handler for POST /api/translate
async fn handle_translate(
    State(state): State<AppState>,
    ExtractJson(body): ExtractJson<TranslateBody>,
) -> Response {
    let request = TranslateRequest {
        text: body.text,
        target_language: body.target_language,
        source_language: body.source_language,
    };
    match state.translate.translate(&request).await {
        Ok(translation) => Json(translation).into_response(),
        Err(e) => {
            tracing::error!("translation failed: {e}");
            error_response(&e)
        }
    }
}
