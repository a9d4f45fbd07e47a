//! Signed webhook events from the payment vendor.
//!
//! The vendor signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac-sha256>` over `"{t}.{payload}"`. This
//! module verifies that scheme, decodes the event envelope, and maps the
//! handled event types onto subscription-status fields of the user's root
//! document. Everything else about billing remains the vendor's business.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::auth::UserId;
use crate::billing::BillingError;
use crate::clock::{Clock, SystemClock};
use crate::store::{DocPath, Document, DocumentStore};
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Subscription status written on a completed checkout.
pub const SUBSCRIPTION_ACTIVE: &str = "active";
/// Subscription status written when the vendor reports a deletion.
pub const SUBSCRIPTION_CANCELLED: &str = "cancelled";

const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Checkout session object carried by `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// The correlated application user, from the reference id or metadata.
    pub fn user_id(&self) -> Option<UserId> {
        self.client_reference_id
            .as_deref()
            .or_else(|| self.metadata.get("userId").map(String::as_str))
            .filter(|id| !id.is_empty())
            .map(UserId::new)
    }
}

/// Subscription object carried by `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SubscriptionObject {
    /// The correlated application user, from metadata.
    pub fn user_id(&self) -> Option<UserId> {
        self.metadata
            .get("userId")
            .filter(|id| !id.is_empty())
            .map(UserId::new)
    }
}

/// A verified, decoded webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionUpdated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    /// Any event type this service does not act on. Acknowledged so the
    /// vendor does not retry deliveries we will never process.
    Other { event_type: String },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: EnvelopeData,
}

#[derive(Deserialize, Default)]
struct EnvelopeData {
    #[serde(default)]
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode an event payload that has already been signature-verified.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_slice(payload).map_err(|e| BillingError::MalformedEvent {
                reason: e.to_string(),
            })?;

        let object = envelope.data.object;
        let decode = |what: &str| BillingError::MalformedEvent {
            reason: format!("invalid {what} object"),
        };

        let event = match envelope.event_type.as_str() {
            "checkout.session.completed" => WebhookEvent::CheckoutCompleted(
                serde_json::from_value(object).map_err(|_| decode("checkout session"))?,
            ),
            "customer.subscription.updated" => WebhookEvent::SubscriptionUpdated(
                serde_json::from_value(object).map_err(|_| decode("subscription"))?,
            ),
            "customer.subscription.deleted" => WebhookEvent::SubscriptionDeleted(
                serde_json::from_value(object).map_err(|_| decode("subscription"))?,
            ),
            _ => WebhookEvent::Other {
                event_type: envelope.event_type,
            },
        };
        Ok(event)
    }
}

/// Verifies webhook deliveries against the shared endpoint secret.
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
    clock: Arc<dyn Clock>,
}

impl WebhookVerifier {
    /// Create a verifier for the given endpoint secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the accepted timestamp tolerance (default 5 minutes).
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Replace the clock used for tolerance checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify a delivery and decode its event.
    ///
    /// # Arguments
    /// * `payload` - The exact raw request body bytes.
    /// * `signature_header` - The vendor's signature header value.
    ///
    /// # Errors
    /// A signature-classified [`BillingError`] when the header is malformed,
    /// the timestamp is outside tolerance, or no signature matches.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent> {
        let (timestamp, signatures) = parse_signature_header(signature_header)?;

        let now = self.clock.now_millis() as i64 / 1000;
        let skew = (now - timestamp).abs();
        if skew > self.tolerance.as_secs() as i64 {
            return Err(BillingError::TimestampOutOfTolerance {
                skew_secs: skew,
                tolerance_secs: self.tolerance.as_secs() as i64,
            }
            .into());
        }

        let matched = signatures.iter().any(|sig| {
            let Ok(sig) = hex::decode(sig) else {
                return false;
            };
            let Ok(mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
                return false;
            };
            let mac = mac
                .chain_update(timestamp.to_string().as_bytes())
                .chain_update(b".")
                .chain_update(payload);
            mac.verify_slice(&sig).is_ok()
        });
        if !matched {
            return Err(BillingError::SignatureMismatch.into());
        }

        WebhookEvent::from_payload(payload)
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

/// Parse a `t=<unix>,v1=<hex>[,v1=<hex>...]` signature header.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    Error::from(BillingError::MalformedSignatureHeader {
                        reason: format!("invalid timestamp '{value}'"),
                    })
                })?);
            }
            Some(("v1", value)) => signatures.push(value),
            Some(_) => {} // Unknown schemes are ignored, not rejected.
            None => {
                return Err(BillingError::MalformedSignatureHeader {
                    reason: format!("expected key=value, got '{part}'"),
                }
                .into());
            }
        }
    }
    let timestamp = timestamp.ok_or_else(|| BillingError::MalformedSignatureHeader {
        reason: "missing timestamp".to_string(),
    })?;
    if signatures.is_empty() {
        return Err(BillingError::MalformedSignatureHeader {
            reason: "missing v1 signature".to_string(),
        }
        .into());
    }
    Ok((timestamp, signatures))
}

/// Apply a verified event to the document store.
///
/// Maps the handled event types to merge writes on `users/{user}`:
/// checkout completion activates the subscription and records the vendor
/// customer/subscription ids, updates pass the vendor status through, and
/// deletion marks the subscription cancelled. Events without a user
/// correlation id are logged and skipped.
///
/// # Returns
/// The user whose record was updated, or `None` when the event carried no
/// user or needs no action.
pub async fn apply_event(
    store: &dyn DocumentStore,
    clock: &dyn Clock,
    event: &WebhookEvent,
) -> Result<Option<UserId>> {
    let now = clock.now_rfc3339();
    match event {
        WebhookEvent::CheckoutCompleted(session) => {
            let Some(user) = session.user_id() else {
                tracing::warn!("checkout {} completed without a user id", session.id);
                return Ok(None);
            };
            let mut fields = Document::new();
            fields.insert(
                "subscriptionStatus".to_string(),
                SUBSCRIPTION_ACTIVE.into(),
            );
            if let Some(customer) = &session.customer {
                fields.insert("customerId".to_string(), customer.clone().into());
            }
            if let Some(subscription) = &session.subscription {
                fields.insert("subscriptionId".to_string(), subscription.clone().into());
            }
            fields.insert("subscriptionStartDate".to_string(), now.clone().into());
            fields.insert("lastUpdated".to_string(), now.into());
            store.write_merge(&DocPath::user(&user), fields).await?;
            tracing::info!("subscription activated for {user}");
            Ok(Some(user))
        }
        WebhookEvent::SubscriptionUpdated(subscription) => {
            let Some(user) = subscription.user_id() else {
                tracing::warn!(
                    "subscription {} updated without a user id",
                    subscription.id
                );
                return Ok(None);
            };
            let status = subscription
                .status
                .clone()
                .unwrap_or_else(|| SUBSCRIPTION_ACTIVE.to_string());
            let mut fields = Document::new();
            fields.insert("subscriptionStatus".to_string(), status.clone().into());
            fields.insert("lastUpdated".to_string(), now.into());
            store.write_merge(&DocPath::user(&user), fields).await?;
            tracing::info!("subscription status for {user} is now {status}");
            Ok(Some(user))
        }
        WebhookEvent::SubscriptionDeleted(subscription) => {
            let Some(user) = subscription.user_id() else {
                tracing::warn!(
                    "subscription {} deleted without a user id",
                    subscription.id
                );
                return Ok(None);
            };
            let mut fields = Document::new();
            fields.insert(
                "subscriptionStatus".to_string(),
                SUBSCRIPTION_CANCELLED.into(),
            );
            fields.insert("lastUpdated".to_string(), now.into());
            store.write_merge(&DocPath::user(&user), fields).await?;
            tracing::info!("subscription cancelled for {user}");
            Ok(Some(user))
        }
        WebhookEvent::Other { event_type } => {
            tracing::debug!("ignoring unhandled event type {event_type}");
            Ok(None)
        }
    }
}
