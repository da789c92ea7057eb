use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::{AuthUser, UserRole},
    utils::token,
    AppState,
};

/// Who is asking, if anyone. Present on every request under `/api`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.map(|user| user.id)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.0, Some(AuthUser { role: UserRole::Admin, .. }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JWTAuthMiddleware {
    pub user: AuthUser,
}

fn bearer_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_owned())
        })
        .filter(|token| !token.is_empty())
}

/// Resolve the caller without ever rejecting. A missing, expired or forged token
/// leaves the request anonymous.
pub async fn identify(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    let user = bearer_token(&cookie_jar, req.headers()).and_then(|token| {
        match token::decode_token(token, app_state.env.jwt_secret.as_bytes()) {
            Ok(user) => Some(user),
            Err(_) => {
                tracing::debug!("Ignoring invalid token on {}", req.uri().path());
                None
            }
        }
    });

    req.extensions_mut().insert(Viewer(user));
    next.run(req).await
}

pub async fn auth(mut req: Request, next: Next) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.0)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    req.extensions_mut().insert(JWTAuthMiddleware { user });

    Ok(next.run(req).await)
}

pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        tracing::warn!(
            "User {} with role {} denied; requires one of {:?}",
            user.user.id,
            user.user.role.to_str(),
            required_roles
        );
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(next.run(req).await)
}

/// Owner tooling is only reachable on a paid-up plan. Runs after `auth`.
pub async fn require_active_subscription(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?
        .user;

    app_state
        .management_service
        .ensure_active_subscription(user.id)
        .await?;

    Ok(next.run(req).await)
}
