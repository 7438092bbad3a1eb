//! Authentication endpoints: signup, login, token refresh.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::tokens::{AuthTokens, TokenType};
use crate::db::{self, AuthResponse, LoginRequest, RefreshTokensRequest, Role, SignupRequest, User};
use crate::AppState;

use super::error::ApiError;
use super::extract::ValidatedJson;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Register a new account and log it in.
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed or email taken", body = super::error::ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if db::users::email_taken(&state.db, &request.email, None).await? {
        return Err(ApiError::validation_field(
            "email",
            "Email is already in use",
        ));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal("Failed to hash password").with_source(e))?;

    // Self-registered accounts always start as plain users
    let user = User::new(request.email, password_hash, request.name, Role::User);
    db::users::insert(&state.db, &user).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "New account registered");

    let tokens = state.tokens.issue_pair(&user)?;

    // Off the request path; a broken SMTP setup must not fail signup
    if state.mailer.is_enabled() {
        let mailer = state.mailer.clone();
        let (email, name) = (user.email.clone(), user.name.clone());
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome_email(&email, &name).await {
                tracing::warn!(error = %e, "Failed to send welcome email");
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// Exchange credentials for a token pair.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Incorrect credentials", body = super::error::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = db::users::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Incorrect email or password"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Incorrect email or password"));
    }

    let tokens = state.tokens.issue_pair(&user)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// Trade a refresh token for a fresh pair.
#[utoipa::path(
    post,
    path = "/refresh-tokens",
    tag = "auth",
    request_body = RefreshTokensRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthTokens),
        (status = 401, description = "Invalid or expired refresh token", body = super::error::ErrorResponse),
    )
)]
pub async fn refresh_tokens(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RefreshTokensRequest>,
) -> Result<Json<AuthTokens>, ApiError> {
    let claims = state
        .tokens
        .verify(&request.refresh_token, TokenType::Refresh)?;

    // The subject may have been deleted since the token was minted
    let user = db::users::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    let tokens = state.tokens.issue_pair(&user)?;
    Ok(Json(tokens))
}

/// Create the bootstrap admin account on first start, when configured.
pub async fn ensure_admin_user(
    pool: &crate::DbPool,
    admin_email: Option<&str>,
    admin_password: Option<&str>,
) -> anyhow::Result<()> {
    if db::users::count(pool).await? > 0 {
        return Ok(());
    }

    let (email, password) = match (admin_email, admin_password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            tracing::warn!(
                "No users exist and no admin credentials configured; \
                 set auth.admin_email and auth.admin_password to bootstrap one"
            );
            return Ok(());
        }
    };

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    let user = User::new(
        email.to_string(),
        password_hash,
        "Administrator".to_string(),
        Role::Admin,
    );
    db::users::insert(pool, &user).await?;

    tracing::info!(email = %email, "Created admin user during startup");
    Ok(())
}
