use sqlx::types::chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Permanent record that `user_id` has paid to see the protected fields of
/// `property_id`. At most one exists per pair.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct UnlockGrant {
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of an insert-or-return-existing write against the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantOutcome {
    pub created: bool,
    pub grant: UnlockGrant,
}

/// Correlation data echoed back by the payment provider. It only lives for the
/// duration of the checkout handshake and is never used as an idempotency key.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockMetadata {
    pub property_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: String,
    pub checkout_url: Option<String>,
}
