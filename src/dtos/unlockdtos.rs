use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UnlockSessionRequest {
    pub property_id: Uuid,
    // Must match the authenticated caller when present
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnlockErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub retryable: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnlockStatusResponse {
    pub property_id: Uuid,
    pub unlocked: bool,
}
