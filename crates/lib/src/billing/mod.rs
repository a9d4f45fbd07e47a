//! Payment vendor glue.
//!
//! Billing is entirely delegated: [`CheckoutClient`] asks the vendor to host
//! a checkout session, and [`webhook`] verifies the vendor's signed event
//! deliveries and mirrors subscription status onto the user's document. No
//! billing state machine lives in this crate.

use serde::Deserialize;

use crate::auth::UserId;
use crate::{Result, trim_origin};

mod errors;
pub use errors::BillingError;

pub mod webhook;
pub use webhook::{WebhookEvent, WebhookVerifier};

/// Request to start a hosted checkout for a subscription.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub user_id: String,
    pub email: Option<String>,
}

/// A created checkout session: the id and the hosted page to redirect to.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    error: VendorErrorDetail,
}

#[derive(Deserialize, Default)]
struct VendorErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for creating hosted checkout sessions at the payment vendor.
pub struct CheckoutClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    /// Application origin used to build the success/cancel return URLs.
    domain: String,
}

impl CheckoutClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `api_base` - Vendor API origin, e.g. `https://api.stripe.com`.
    /// * `secret_key` - Vendor API secret key.
    /// * `domain` - Application origin for the post-checkout redirects.
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: trim_origin(api_base.into()),
            secret_key: secret_key.into(),
            domain: trim_origin(domain.into()),
        }
    }

    /// Create a subscription checkout session for a user.
    ///
    /// The user id rides along as both the client reference id and metadata
    /// on the session and the subscription, so webhook deliveries can be
    /// correlated back to the user.
    ///
    /// # Errors
    /// [`BillingError::MissingField`] before any vendor call when `price_id`
    /// or `user_id` is empty; [`BillingError::Vendor`] with the vendor's
    /// message on a failed request.
    pub async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if request.price_id.is_empty() {
            return Err(BillingError::MissingField { name: "priceId" }.into());
        }
        if request.user_id.is_empty() {
            return Err(BillingError::MissingField { name: "userId" }.into());
        }
        let user = UserId::new(&request.user_id);

        let success_url = format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.domain);
        let cancel_url = format!("{}/cancel", self.domain);
        let mut form: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("client_reference_id", user.to_string()),
            ("metadata[userId]", user.to_string()),
            ("subscription_data[metadata][userId]", user.to_string()),
        ];
        if let Some(email) = &request.email {
            form.push(("customer_email", email.clone()));
        }

        tracing::info!("creating checkout session for {user}");
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| BillingError::Vendor {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = vendor_message(response).await;
            return Err(BillingError::Vendor {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let session: CheckoutSession =
            response
                .json()
                .await
                .map_err(|e| BillingError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        tracing::info!("checkout session {} created", session.id);
        Ok(session)
    }
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClient")
            .field("api_base", &self.api_base)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Extract the vendor's error message from a failed response body.
async fn vendor_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<VendorErrorBody>(&text) {
        Ok(body) if !body.error.message.is_empty() => body.error.message,
        _ if !text.is_empty() => text,
        _ => "vendor request failed".to_string(),
    }
}
