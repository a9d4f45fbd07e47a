//! Pure pass-through clients for the speech and translation vendors.
//!
//! These carry no modeling of their own: input is validated, forwarded, and
//! the vendor's answer is reshaped for the application. Both vendors are
//! reached over plain HTTPS with JSON bodies.

use crate::constants::MAX_PROXY_TEXT_LEN;

mod errors;
pub use errors::ProxyError;

mod speech;
pub use speech::{DEFAULT_VOICE_ID, SpeechClient, SpeechRequest, Synthesis};

mod translate;
pub use translate::{
    DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE, TranslateClient, TranslateRequest,
    Translation,
};

/// Validate proxy input text: non-empty after trimming, bounded length.
///
/// Rejected input never reaches a vendor.
fn validate_text(text: &str) -> Result<(), ProxyError> {
    if text.trim().is_empty() {
        return Err(ProxyError::EmptyText);
    }
    let length = text.chars().count();
    if length > MAX_PROXY_TEXT_LEN {
        return Err(ProxyError::TextTooLong {
            length,
            max: MAX_PROXY_TEXT_LEN,
        });
    }
    Ok(())
}

/// Log-friendly preview of a possibly long text.
fn preview(text: &str) -> String {
    const PREVIEW_LEN: usize = 50;
    if text.chars().count() <= PREVIEW_LEN {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    }
}
