//! OpenAPI document, generated from the handler annotations.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "keelson",
        description = "A batteries-included starter for CRUD REST APIs"
    ),
    paths(
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::refresh_tokens,
        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
    ),
    components(schemas(
        crate::db::SignupRequest,
        crate::db::LoginRequest,
        crate::db::RefreshTokensRequest,
        crate::db::CreateUserRequest,
        crate::db::UpdateUserRequest,
        crate::db::Role,
        crate::db::UserResponse,
        crate::db::UserPage,
        crate::db::AuthResponse,
        crate::auth::AuthTokens,
        crate::api::error::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and token refresh"),
        (name = "users", description = "User management"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
