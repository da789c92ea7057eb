use std::sync::Arc;

use axum::{
    http::{
        header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handler::{
        owner::owner_handler,
        properties::{admin_property_handler, property_handler},
        unlock::{create_unlock_session, unlock_session_preflight},
        webhook::stripe_webhook,
    },
    middleware::main_middleware::identify,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

// Browsers call /unlock-session from the storefront origin, so preflights must
// always succeed.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/properties", property_handler())
        .nest("/admin/properties", admin_property_handler())
        .nest("/owner", owner_handler())
        .route(
            "/unlock-session",
            post(create_unlock_session).options(unlock_session_preflight),
        )
        .route("/webhooks/stripe", post(stripe_webhook))
        .layer(middleware::from_fn(identify))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .layer(cors_layer())
}
