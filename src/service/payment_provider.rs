// service/payment_provider.rs
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    models::{managementmodel::SubscriptionStatus, unlockmodel::UnlockMetadata},
};

/// Seconds a signed webhook stays acceptable after the provider signed it.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub product_name: String,
    pub product_description: String,
    pub metadata: UnlockMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

/// Monthly plan for the owner tooling. `user_id` is attached to the subscription
/// itself so every later lifecycle event carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionCheckoutRequest {
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open one hosted checkout session. `metadata` comes back verbatim on the
    /// provider's completion event.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession>;

    async fn create_subscription_session(
        &self,
        request: SubscriptionCheckoutRequest,
    ) -> anyhow::Result<CheckoutSession>;
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
        }
    }

    // Stripe takes form-encoded bodies with bracketed keys for nested objects.
    fn form_params(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.amount_cents.to_string()),
            ("line_items[0][price_data][product_data][name]", request.product_name.clone()),
            (
                "line_items[0][price_data][product_data][description]",
                request.product_description.clone(),
            ),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            (
                "client_reference_id",
                format!("{}:{}", request.metadata.user_id, request.metadata.property_id),
            ),
            ("metadata[propertyId]", request.metadata.property_id.to_string()),
            ("metadata[userId]", request.metadata.user_id.to_string()),
        ]
    }

    fn subscription_form_params(request: &SubscriptionCheckoutRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.amount_cents.to_string()),
            ("line_items[0][price_data][recurring][interval]", "month".to_string()),
            ("line_items[0][price_data][product_data][name]", request.product_name.clone()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("client_reference_id", request.user_id.to_string()),
            ("subscription_data[metadata][userId]", request.user_id.to_string()),
        ]
    }

    async fn open_session(&self, params: Vec<(&'static str, String)>) -> anyhow::Result<CheckoutSession> {
        let body = serde_urlencoded::to_string(params)?;

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let response_body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or("Checkout session creation failed");
            return Err(anyhow::anyhow!("stripe returned {}: {}", status, message));
        }

        let id = response_body["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("stripe response is missing the session id"))?;

        Ok(CheckoutSession {
            id: id.to_string(),
            url: response_body["url"].as_str().map(str::to_string),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        self.open_session(Self::form_params(&request)).await
    }

    async fn create_subscription_session(
        &self,
        request: SubscriptionCheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        self.open_session(Self::subscription_form_params(&request)).await
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    Malformed,

    #[error("Signature timestamp outside tolerance")]
    Stale,

    #[error("Signature does not match payload")]
    Mismatch,
}

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>…]`) against the
/// raw request body.
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    // The timestamp is attacker-controlled; abs_diff cannot overflow.
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS as u64 {
        return Err(SignatureError::Stale);
    }

    let expected = sign(payload, timestamp, secret);
    let matched = candidates
        .iter()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded,
    Failed,
    // Checkout finished but the funds settle later (bank debits)
    Pending,
}

/// A provider callback reduced to what reconciliation needs. `metadata` is `None`
/// when the echoed correlation data is missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub session_id: String,
    pub status: PaymentStatus,
    pub metadata: Option<UnlockMetadata>,
}

/// Latest known state of an owner's plan, from `customer.subscription.*` events.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub stripe_subscription_id: String,
    pub user_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Payment(PaymentOutcome),
    Subscription(SubscriptionUpdate),
    Unhandled(String),
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

pub fn parse_stripe_event(body: &[u8]) -> Result<WebhookEvent, serde_json::Error> {
    let event: StripeEvent = serde_json::from_slice(body)?;
    let object = &event.data.object;

    if let Some(update) = subscription_update(&event.event_type, object) {
        return Ok(WebhookEvent::Subscription(update));
    }

    let status = match event.event_type.as_str() {
        // Subscription checkouts are settled through the subscription events.
        "checkout.session.completed" if object["mode"].as_str() == Some("subscription") => {
            return Ok(WebhookEvent::Unhandled(event.event_type))
        }
        "checkout.session.completed" => match object["payment_status"].as_str() {
            Some("paid") | Some("no_payment_required") => PaymentStatus::Succeeded,
            _ => PaymentStatus::Pending,
        },
        "checkout.session.async_payment_succeeded" => PaymentStatus::Succeeded,
        "checkout.session.async_payment_failed" | "checkout.session.expired" => PaymentStatus::Failed,
        _ => return Ok(WebhookEvent::Unhandled(event.event_type)),
    };

    let metadata = serde_json::from_value::<UnlockMetadata>(object["metadata"].clone()).ok();

    Ok(WebhookEvent::Payment(PaymentOutcome {
        session_id: object["id"].as_str().unwrap_or_default().to_string(),
        status,
        metadata,
    }))
}

fn subscription_update(event_type: &str, object: &serde_json::Value) -> Option<SubscriptionUpdate> {
    let status = match event_type {
        "customer.subscription.deleted" => SubscriptionStatus::Canceled,
        "customer.subscription.created" | "customer.subscription.updated" => {
            match object["status"].as_str() {
                Some("active") | Some("trialing") => SubscriptionStatus::Active,
                Some("canceled") | Some("incomplete_expired") => SubscriptionStatus::Canceled,
                _ => SubscriptionStatus::PastDue,
            }
        }
        _ => return None,
    };

    let current_period_end = object["current_period_end"]
        .as_i64()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    Some(SubscriptionUpdate {
        stripe_subscription_id: object["id"].as_str().unwrap_or_default().to_string(),
        user_id: object["metadata"]["userId"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok()),
        status,
        current_period_end,
        cancel_at_period_end: object["cancel_at_period_end"].as_bool().unwrap_or(false),
    })
}
