//! User CRUD endpoints.
//!
//! List and create are gated by permission middleware in the router; the
//! per-id routes allow self-access and enforce permissions in the handler.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::rbac::{CurrentUser, PERM_USERS_MANAGE, PERM_USERS_READ};
use crate::db::{
    self, CreateUserRequest, ListUsersQuery, UpdateUserRequest, User, UserPage, UserResponse,
};
use crate::AppState;

use super::auth::hash_password;
use super::error::ApiError;
use super::extract::ValidatedJson;
use super::validation::validate_uuid;

const MAX_PER_PAGE: u32 = 100;

/// Create a user with an explicit role.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed or email taken", body = super::error::ErrorResponse),
        (status = 403, description = "Missing users:manage", body = super::error::ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if db::users::email_taken(&state.db, &request.email, None).await? {
        return Err(ApiError::validation_field(
            "email",
            "Email is already in use",
        ));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal("Failed to hash password").with_source(e))?;

    let user = User::new(request.email, password_hash, request.name, request.role);
    db::users::insert(&state.db, &user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List users, newest first.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "A page of users", body = UserPage),
        (status = 403, description = "Missing users:read", body = super::error::ErrorResponse),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);
    let offset = (page - 1).saturating_mul(per_page);

    let total = db::users::count(&state.db).await?;
    let users = db::users::list(&state.db, per_page, offset).await?;

    Ok(Json(UserPage {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// Fetch a single user. Callers may always fetch themselves.
#[utoipa::path(
    get,
    path = "/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Not self and missing users:read", body = super::error::ErrorResponse),
        (status = 404, description = "No such user", body = super::error::ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_uuid(&user_id, "userId").map_err(|e| ApiError::validation_field("userId", e))?;

    if current.id != user_id && !current.has_permission(PERM_USERS_READ) {
        return Err(ApiError::forbidden(
            "You may only view your own account",
        ));
    }

    let user = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// Update a user. Callers may update themselves; changing any role requires
/// `users:manage`.
#[utoipa::path(
    put,
    path = "/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation failed or email taken", body = super::error::ErrorResponse),
        (status = 403, description = "Not permitted", body = super::error::ErrorResponse),
        (status = 404, description = "No such user", body = super::error::ErrorResponse),
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_uuid(&user_id, "userId").map_err(|e| ApiError::validation_field("userId", e))?;

    if current.id != user_id && !current.has_permission(PERM_USERS_MANAGE) {
        return Err(ApiError::forbidden(
            "You may only update your own account",
        ));
    }
    if request.role.is_some() && !current.has_permission(PERM_USERS_MANAGE) {
        return Err(ApiError::forbidden("Changing roles requires users:manage"));
    }

    let mut user = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(email) = request.email {
        if db::users::email_taken(&state.db, &email, Some(&user_id)).await? {
            return Err(ApiError::validation_field(
                "email",
                "Email is already in use",
            ));
        }
        user.email = email;
    }
    if let Some(password) = request.password {
        user.password_hash = hash_password(&password)
            .map_err(|e| ApiError::internal("Failed to hash password").with_source(e))?;
    }
    if let Some(name) = request.name {
        user.name = name;
    }
    if let Some(role) = request.role {
        user.role = role.to_string();
    }
    user.touch();

    db::users::update(&state.db, &user).await?;

    tracing::info!(user_id = %user.id, "User updated");

    Ok(Json(user.into()))
}

/// Delete a user. Callers may delete themselves.
#[utoipa::path(
    delete,
    path = "/users/{userId}",
    tag = "users",
    params(("userId" = String, Path, description = "User id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not permitted", body = super::error::ErrorResponse),
        (status = 404, description = "No such user", body = super::error::ErrorResponse),
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_uuid(&user_id, "userId").map_err(|e| ApiError::validation_field("userId", e))?;

    if current.id != user_id && !current.has_permission(PERM_USERS_MANAGE) {
        return Err(ApiError::forbidden(
            "You may only delete your own account",
        ));
    }

    let removed = db::users::delete(&state.db, &user_id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
