use std::sync::Arc;

use axum::{
    extract::{Path, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::managementdtos::{
        CreateTenantDto, CreateTicketDto, RecordExpenseDto, RecordPaymentDto, UpdateTicketStatusDto,
    },
    error::HttpError,
    middleware::main_middleware::{auth, require_active_subscription, role_check, JWTAuthMiddleware},
    models::usermodel::UserRole,
    AppState,
};

pub fn owner_handler() -> Router {
    let tools = Router::new()
        .route("/tenants", get(list_tenants).post(add_tenant))
        .route("/tickets", get(list_tickets).post(open_ticket))
        .route("/tickets/:ticket_id/status", put(update_ticket_status))
        .route("/payments", get(list_payments).post(record_payment))
        .route("/expenses", get(list_expenses).post(record_expense))
        .route("/dashboard", get(get_dashboard))
        .layer(middleware::from_fn(require_active_subscription));

    Router::new()
        .route("/subscription", get(get_subscription))
        .route("/subscription/checkout", post(start_subscription_checkout))
        .merge(tools)
        .layer(middleware::from_fn(|req: Request, next: Next| {
            role_check(req, next, vec![UserRole::Owner])
        }))
        .layer(middleware::from_fn(auth))
}

pub async fn get_subscription(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .management_service
        .subscription_status(user.user.id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": status
    })))
}

pub async fn start_subscription_checkout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let session = app_state
        .management_service
        .start_subscription_checkout(user.user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "sessionId": session.session_id,
                "url": session.checkout_url
            }
        })),
    ))
}

pub async fn add_tenant(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateTenantDto>,
) -> Result<impl IntoResponse, HttpError> {
    let tenant = app_state
        .management_service
        .add_tenant(user.user.id, body)
        .await?;

    tracing::info!("Owner {} added tenant {} to property {}", user.user.id, tenant.id, tenant.property_id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "tenant": tenant
            }
        })),
    ))
}

pub async fn list_tenants(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tenants = app_state.management_service.list_tenants(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": tenants.len(),
        "data": {
            "tenants": tenants
        }
    })))
}

pub async fn open_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .management_service
        .open_ticket(user.user.id, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "ticket": ticket
            }
        })),
    ))
}

pub async fn list_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state.management_service.list_tickets(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": tickets.len(),
        "data": {
            "tickets": tickets
        }
    })))
}

pub async fn update_ticket_status(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateTicketStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .management_service
        .update_ticket_status(user.user.id, ticket_id, body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "ticket": ticket
        }
    })))
}

pub async fn record_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<RecordPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .management_service
        .record_payment(user.user.id, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "payment": payment
            }
        })),
    ))
}

pub async fn list_payments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state.management_service.list_payments(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": payments.len(),
        "data": {
            "payments": payments
        }
    })))
}

pub async fn record_expense(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<RecordExpenseDto>,
) -> Result<impl IntoResponse, HttpError> {
    let expense = app_state
        .management_service
        .record_expense(user.user.id, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "expense": expense
            }
        })),
    ))
}

pub async fn list_expenses(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let expenses = app_state.management_service.list_expenses(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": expenses.len(),
        "data": {
            "expenses": expenses
        }
    })))
}

pub async fn get_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let dashboard = app_state.management_service.dashboard(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": dashboard
    })))
}
