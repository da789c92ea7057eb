use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        propertydtos::{CreatePropertyDto, PropertyFilterQuery},
        unlockdtos::UnlockStatusResponse,
    },
    error::HttpError,
    middleware::main_middleware::{auth, role_check, JWTAuthMiddleware, Viewer},
    models::usermodel::UserRole,
    service::{
        access_gate::{redact, Access},
        error::ServiceError,
        filter_compiler::{compile, PropertyFilter},
    },
    AppState,
};

pub fn property_handler() -> Router {
    Router::new()
        .route(
            "/",
            get(search_properties).merge(
                post(create_property)
                    .layer(middleware::from_fn(|req: Request, next: Next| {
                        role_check(req, next, vec![UserRole::Owner, UserRole::Admin])
                    }))
                    .layer(middleware::from_fn(auth)),
            ),
        )
        .route(
            "/mine",
            get(get_my_properties).layer(middleware::from_fn(auth)),
        )
        .route("/:property_id", get(get_property))
        .route(
            "/:property_id/unlock-status",
            get(get_unlock_status).layer(middleware::from_fn(auth)),
        )
}

pub fn admin_property_handler() -> Router {
    Router::new()
        .route("/pending", get(get_pending_properties))
        .route("/:property_id/approve", put(approve_property))
        .route("/:property_id/unapprove", put(unapprove_property))
        .route("/:property_id", delete(delete_property))
        .layer(middleware::from_fn(|req: Request, next: Next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth))
}

pub async fn search_properties(
    Query(query): Query<PropertyFilterQuery>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = PropertyFilter::try_from(&query)?;
    let mut plan = compile(&filter);
    if let Some((page, limit)) = query.pagination()? {
        plan = plan.paginate(page, limit);
    }

    let properties = if plan.is_satisfiable() {
        app_state
            .catalog
            .query_properties(&plan)
            .await
            .map_err(ServiceError::from)?
    } else {
        Vec::new()
    };

    let views = app_state
        .access_gate
        .project_many(&properties, viewer.user_id())
        .await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": views.len(),
        "data": {
            "properties": views
        }
    })))
}

pub async fn get_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, HttpError> {
    // Pending listings exist only for their owner and the moderators.
    let property = app_state
        .catalog
        .get_property_by_id(property_id)
        .await
        .map_err(ServiceError::from)?
        .filter(|p| {
            p.approved
                || viewer.is_admin()
                || viewer.user_id().map_or(false, |id| p.is_owned_by(id))
        })
        .ok_or(ServiceError::NotFound(property_id))?;

    let mut view = app_state
        .access_gate
        .project(&property, viewer.user_id())
        .await;

    match app_state.catalog.increment_views(property_id).await {
        Ok(()) => view.views += 1,
        Err(e) => tracing::warn!("Failed to record view for property {}: {}", property_id, e),
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": view
        }
    })))
}

pub async fn create_property(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreatePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(ServiceError::from)?;

    let property = app_state
        .catalog
        .create_property(user.user.id, body)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!("User {} listed property {} for review", user.user.id, property.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Property created successfully and sent for review",
            "data": {
                "property": redact(&property, Access::Full)
            }
        })),
    ))
}

pub async fn get_my_properties(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let properties = app_state
        .catalog
        .get_properties_by_owner(user.user.id)
        .await
        .map_err(ServiceError::from)?;

    let views = app_state
        .access_gate
        .project_many(&properties, Some(user.user.id))
        .await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": views.len(),
        "data": {
            "properties": views
        }
    })))
}

pub async fn get_unlock_status(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let unlocked = app_state
        .unlock_service
        .is_unlocked(user.user.id, property_id)
        .await?;

    Ok(Json(UnlockStatusResponse { property_id, unlocked }))
}

// Moderation sees every field; that is what it reviews.
pub async fn get_pending_properties(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let properties = app_state
        .catalog
        .get_pending_properties()
        .await
        .map_err(ServiceError::from)?;

    let views: Vec<_> = properties
        .iter()
        .map(|p| redact(p, Access::Full))
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": views.len(),
        "data": {
            "properties": views
        }
    })))
}

async fn set_approval(
    app_state: &AppState,
    admin: &JWTAuthMiddleware,
    property_id: Uuid,
    approved: bool,
) -> Result<impl IntoResponse, HttpError> {
    let property = app_state
        .catalog
        .set_property_approval(property_id, approved)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound(property_id))?;

    tracing::info!(
        "Admin {} set approval of property {} to {}",
        admin.user.id, property_id, approved
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": redact(&property, Access::Full)
        }
    })))
}

pub async fn approve_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    set_approval(&app_state, &user, property_id, true).await
}

pub async fn unapprove_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    set_approval(&app_state, &user, property_id, false).await
}

pub async fn delete_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .catalog
        .delete_property(property_id)
        .await
        .map_err(ServiceError::from)?;

    if !deleted {
        return Err(ServiceError::NotFound(property_id).into());
    }

    tracing::info!("Admin {} removed property {}", user.user.id, property_id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Property deleted"
    })))
}
