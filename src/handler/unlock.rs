use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::{
    dtos::unlockdtos::{UnlockErrorResponse, UnlockSessionRequest, UnlockSessionResponse},
    middleware::main_middleware::Viewer,
    models::unlockmodel::SessionHandle,
    service::error::ServiceError,
    AppState,
};

/// `POST /unlock-session`. Every rejection is a 400 carrying the error kind; a
/// provider outage is a retryable 502.
pub async fn create_unlock_session(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    body: Result<Json<UnlockSessionRequest>, JsonRejection>,
) -> Response {
    match begin_unlock(&app_state, viewer, body).await {
        Ok(handle) => (
            StatusCode::OK,
            Json(UnlockSessionResponse {
                session_id: handle.session_id,
                checkout_url: handle.checkout_url,
            }),
        )
            .into_response(),
        Err(error) => unlock_error_response(error),
    }
}

async fn begin_unlock(
    app_state: &AppState,
    viewer: Viewer,
    body: Result<Json<UnlockSessionRequest>, JsonRejection>,
) -> Result<SessionHandle, ServiceError> {
    let Json(request) = body.map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;

    // The token decides who is paying; a body userId can only agree with it.
    let caller = viewer.user_id();
    if let (Some(claimed), Some(actual)) = (request.user_id, caller) {
        if claimed != actual {
            tracing::warn!(
                "Unlock request for property {} claimed user {} but token belongs to {}",
                request.property_id, claimed, actual
            );
            return Err(ServiceError::Unauthenticated);
        }
    }

    app_state
        .unlock_service
        .begin_unlock(caller, request.property_id)
        .await
}

fn unlock_error_response(error: ServiceError) -> Response {
    let status = if error.is_retryable() {
        tracing::error!("Unlock session failed upstream: {}", error);
        StatusCode::BAD_GATEWAY
    } else {
        tracing::info!("Unlock session rejected ({}): {}", error.kind(), error);
        StatusCode::BAD_REQUEST
    };

    let body = UnlockErrorResponse {
        error: error.to_string(),
        kind: error.kind().to_string(),
        retryable: error.is_retryable(),
    };

    (status, Json(body)).into_response()
}

pub async fn unlock_session_preflight() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
