//! Translation pass-through.

use serde::Deserialize;
use serde_json::json;

use crate::proxy::{ProxyError, preview, validate_text};
use crate::{Result, trim_origin};

/// Languages used when the caller names none.
pub const DEFAULT_TARGET_LANGUAGE: &str = "Hebrew";
pub const DEFAULT_SOURCE_LANGUAGE: &str = "English";

const MODEL: &str = "gpt-4";

/// Request to translate a piece of text.
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: Option<String>,
    pub source_language: Option<String>,
}

/// A completed translation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Translation {
    pub original: String,
    pub translation: String,
    #[serde(rename = "sourceLanguage")]
    pub source_language: String,
    #[serde(rename = "targetLanguage")]
    pub target_language: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatErrorBody {
    #[serde(default)]
    error: ChatErrorDetail,
}

#[derive(Deserialize, Default)]
struct ChatErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for the translation vendor (a chat-completion API behind a fixed
/// translator prompt).
pub struct TranslateClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl TranslateClient {
    /// Create a client for the given vendor origin and API key.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: trim_origin(api_base.into()),
            api_key: api_key.into(),
        }
    }

    /// Translate the request's text.
    ///
    /// # Errors
    /// Validation errors before any vendor call; [`ProxyError::Vendor`] with
    /// the vendor's message otherwise.
    pub async fn translate(&self, request: &TranslateRequest) -> Result<Translation> {
        validate_text(&request.text)?;
        let target = request
            .target_language
            .clone()
            .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());
        let source = request
            .source_language
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string());

        let system = format!(
            "You are a professional translator specializing in {source} to {target} \
             translation. Provide accurate, natural translations that preserve the \
             meaning and tone of the original text. Only respond with the translation, \
             nothing else."
        );
        let user = format!(
            "Translate the following {source} text to {target}:\n\n{}",
            request.text
        );

        tracing::info!("translating: {}", preview(&request.text));
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": MODEL,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
                "temperature": 0.3,
                "max_tokens": 1000,
            }))
            .send()
            .await
            .map_err(|e| ProxyError::Vendor {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ChatErrorBody>(&text) {
                Ok(body) if !body.error.message.is_empty() => body.error.message,
                _ if !text.is_empty() => text,
                _ => "translation request failed".to_string(),
            };
            tracing::error!("translation vendor error: {message}");
            return Err(ProxyError::Vendor {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProxyError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        let translation = body
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProxyError::MalformedResponse {
                reason: "response carried no translation".to_string(),
            })?;

        tracing::info!("translation successful");
        Ok(Translation {
            original: request.text.clone(),
            translation,
            source_language: source,
            target_language: target,
        })
    }
}

impl std::fmt::Debug for TranslateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslateClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
