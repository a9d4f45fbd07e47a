//! Text-to-speech pass-through.

use base64ct::{Base64, Encoding};
use serde_json::json;

use crate::proxy::{ProxyError, preview, validate_text};
use crate::{Result, trim_origin};

/// Default vendor voice used when the caller names none.
pub const DEFAULT_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";

const MODEL_ID: &str = "eleven_multilingual_v2";

/// Request to synthesize speech for a piece of text.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
}

/// Synthesized speech, with the audio inlined as a data URL.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Synthesis {
    /// `data:audio/mpeg;base64,...` payload, playable directly by a client.
    pub audio: String,
    pub text: String,
    #[serde(rename = "voiceId")]
    pub voice_id: String,
}

/// Client for the text-to-speech vendor.
pub struct SpeechClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl SpeechClient {
    /// Create a client for the given vendor origin and API key.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: trim_origin(api_base.into()),
            api_key: api_key.into(),
        }
    }

    /// Synthesize speech for the request's text.
    ///
    /// # Errors
    /// Validation errors before any vendor call; [`ProxyError::Vendor`] with
    /// the vendor's message otherwise.
    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<Synthesis> {
        validate_text(&request.text)?;
        let voice_id = request
            .voice_id
            .clone()
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());

        tracing::info!("generating speech for: {}", preview(&request.text));
        let response = self
            .http
            .post(format!("{}/v1/text-to-speech/{voice_id}", self.api_base))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": request.text,
                "model_id": MODEL_ID,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                },
            }))
            .send()
            .await
            .map_err(|e| ProxyError::Vendor {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("speech vendor error: {message}");
            return Err(ProxyError::Vendor {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProxyError::MalformedResponse {
                reason: e.to_string(),
            })?;
        let encoded = Base64::encode_string(&audio);

        tracing::info!("speech generation successful ({} bytes)", audio.len());
        Ok(Synthesis {
            audio: format!("data:audio/mpeg;base64,{encoded}"),
            text: request.text.clone(),
            voice_id,
        })
    }
}

impl std::fmt::Debug for SpeechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
