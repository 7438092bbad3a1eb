pub mod auth;
pub mod docs;
pub mod error;
pub mod extract;
pub mod users;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{require_auth, require_permission};
use crate::auth::rbac::{PERM_USERS_MANAGE, PERM_USERS_READ};
use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh-tokens", post(auth::refresh_tokens));

    // Protected user routes. The permission layers only cover the routes
    // registered before them; the per-id routes check permissions in the
    // handler so self-access works.
    let user_routes = Router::new()
        .route("/users", post(users::create_user))
        .route_layer(middleware::from_fn(require_permission(PERM_USERS_MANAGE)))
        .merge(
            Router::new()
                .route("/users", get(users::list_users))
                .route_layer(middleware::from_fn(require_permission(PERM_USERS_READ))),
        )
        .route(
            "/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Protected by auth
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .route("/docs/openapi.json", get(docs::openapi_json))
        .merge(auth_routes)
        .merge(user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Build the CORS layer from config. Credentials are only honored for an
/// explicit origin; tower-http rejects credentials with a wildcard.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.origin == "*" {
        return layer.allow_origin(Any);
    }

    match config.origin.parse::<HeaderValue>() {
        Ok(origin) => {
            let layer = layer.allow_origin(origin);
            if config.credentials {
                layer.allow_credentials(true)
            } else {
                layer
            }
        }
        Err(_) => {
            tracing::warn!(origin = %config.origin, "Invalid CORS origin, falling back to any");
            layer.allow_origin(Any)
        }
    }
}
