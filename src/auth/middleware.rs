//! Axum middleware for authentication and permission checks.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::auth::rbac::CurrentUser;
use crate::auth::tokens::{TokenError, TokenType};
use crate::AppState;

/// Bearer-token authentication layer for protected routes.
///
/// Verifies the access token and injects [`CurrentUser`] into request
/// extensions. Missing, malformed, expired, or wrong-type tokens all yield
/// 401; permission checks happen in [`require_permission`] or in handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing or malformed authorization header"))?;

    match state.tokens.verify(token, TokenType::Access) {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser::from_claims(&claims));
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(uri = %req.uri(), error = %e, "Rejected bearer token");
            match e {
                TokenError::Expired => Err(ApiError::unauthorized("Token has expired")),
                _ => Err(ApiError::unauthorized("Invalid token")),
            }
        }
    }
}

/// Permission-check layer. Runs after [`require_auth`] and rejects with 403
/// when the caller's role does not grant `permission`.
///
/// ```ignore
/// Router::new()
///     .route("/users", get(users::list_users))
///     .route_layer(middleware::from_fn(require_permission("users:read")));
/// ```
pub fn require_permission(
    permission: &'static str,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>> + Clone
{
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

            if !user.has_permission(permission) {
                tracing::warn!(
                    user_id = %user.id,
                    required = %permission,
                    "Permission denied"
                );
                return Err(ApiError::forbidden(format!(
                    "Missing required permission: {}",
                    permission
                )));
            }

            Ok(next.run(req).await)
        })
    }
}

/// Extractor for the authenticated caller inside handlers.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
