use std::sync::Arc;

use axum::{body::Bytes, http::HeaderMap, response::IntoResponse, Extension, Json};
use chrono::Utc;

use crate::{
    error::HttpError,
    service::payment_provider::{parse_stripe_event, verify_stripe_signature, WebhookEvent},
    AppState,
};

/// Stripe delivers at least once and retries on any non-2xx answer, so storage
/// failures are surfaced and everything else is acknowledged.
pub async fn stripe_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HttpError::bad_request("Missing or invalid Stripe signature"))?;

    verify_stripe_signature(
        &body,
        signature,
        &app_state.env.stripe_webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!("Rejected Stripe webhook: {}", e);
        HttpError::bad_request(format!("Invalid webhook signature: {}", e))
    })?;

    let event = parse_stripe_event(&body).map_err(|e| {
        tracing::warn!("Unreadable Stripe webhook payload: {}", e);
        HttpError::bad_request("Malformed webhook payload")
    })?;

    match event {
        WebhookEvent::Unhandled(event_type) => {
            tracing::debug!("Ignoring Stripe event {}", event_type);
            Ok(Json(serde_json::json!({ "received": true })))
        }
        WebhookEvent::Payment(outcome) => {
            let session_id = outcome.session_id.clone();
            let result = app_state.unlock_service.reconcile(outcome).await?;
            tracing::info!("Stripe session {} reconciled as {:?}", session_id, result);

            Ok(Json(serde_json::json!({
                "received": true,
                "outcome": result
            })))
        }
        WebhookEvent::Subscription(update) => {
            let applied = app_state
                .management_service
                .apply_subscription_update(update)
                .await?;

            Ok(Json(serde_json::json!({
                "received": true,
                "subscription": applied.map(|s| s.status)
            })))
        }
    }
}
