use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource {0} not found")]
    NotFound(Uuid),

    #[error("Property {property_id} is already unlocked for user {user_id}")]
    AlreadyUnlocked { user_id: Uuid, property_id: Uuid },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("User {0} is not allowed to perform this action")]
    Forbidden(Uuid),

    #[error("Owner {0} has no active subscription")]
    SubscriptionInactive(Uuid),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl ServiceError {
    /// Stable, machine-checkable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AlreadyUnlocked { .. } => "already_unlocked",
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::SubscriptionInactive(_) => "subscription_required",
            ServiceError::Upstream(_) => "upstream_failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Upstream(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::AlreadyUnlocked { .. } => StatusCode::BAD_REQUEST,

            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::SubscriptionInactive(_) => StatusCode::PAYMENT_REQUIRED,

            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Upstream(format!("database: {}", err))
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        if let ServiceError::Upstream(ref detail) = error {
            tracing::error!("upstream failure: {}", detail);
        }
        HttpError::new(error.to_string(), error.status_code())
    }
}
