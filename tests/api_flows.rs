//! End-to-end flows through the router against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;

use tower::ServiceExt;

use keelson::api;
use keelson::auth::{Claims, TokenType};
use keelson::config::Config;
use keelson::db::{self, Role, User};
use keelson::AppState;

const SECRET: &str = "flow-test-secret-key";

async fn test_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.auth.secret_key = SECRET.to_string();
    config.auth.access_token_minutes = 30;

    let pool = db::connect("sqlite::memory:", 1).await.expect("pool");
    let state = Arc::new(AppState::new(config, pool));
    (api::create_router(state.clone()), state)
}

async fn seed_user(state: &AppState, email: &str, password: &str, role: Role) -> User {
    let hash = api::auth::hash_password(password).unwrap();
    let user = User::new(email.to_string(), hash, "Seeded".to_string(), role);
    db::users::insert(&state.db, &user).await.unwrap();
    user
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn login(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn access_token(auth_body: &Value) -> String {
    auth_body["tokens"]["access_token"].as_str().unwrap().to_string()
}

/// Mint an access token that expired well past the decode leeway.
fn expired_access_token(user: &User) -> String {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        token_type: TokenType::Access,
        iat: (now - chrono::Duration::hours(3)).timestamp(),
        exp: (now - chrono::Duration::hours(2)).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn signup_then_login_flow() {
    let (app, _state) = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/signup",
        None,
        Some(json!({
            "email": "jane@example.com",
            "password": "passw0rd1",
            "name": "Jane"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["tokens"]["access_token"].is_string());
    assert!(body["tokens"]["refresh_token"].is_string());

    let login_body = login(&app, "jane@example.com", "passw0rd1").await;
    assert_eq!(login_body["user"]["email"], "jane@example.com");

    // Wrong password is a 401 with the numeric code in the envelope
    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"email": "jane@example.com", "password": "wrong-pass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
    assert!(body["message"].as_str().unwrap().contains("Incorrect"));
}

#[tokio::test]
async fn duplicate_signup_is_field_level_400() {
    let (app, _state) = test_app().await;

    let payload = json!({
        "email": "jane@example.com",
        "password": "passw0rd1",
        "name": "Jane"
    });
    let (status, _) = send(&app, Method::POST, "/signup", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/signup", None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["details"]["email"][0], "Email is already in use");
}

#[tokio::test]
async fn dto_validation_failures_are_field_level_400s() {
    let (app, _state) = test_app().await;

    // Missing required field: the message names the field
    let (status, body) = send(
        &app,
        Method::POST,
        "/signup",
        None,
        Some(json!({"email": "jane@example.com", "name": "Jane"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["message"].as_str().unwrap().contains("password"));

    // Rule violations carry per-field details
    let (status, body) = send(
        &app,
        Method::POST,
        "/signup",
        None,
        Some(json!({"email": "not-an-email", "password": "short", "name": "Jane"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["email"][0], "Invalid email address");
    assert_eq!(
        body["details"]["password"][0],
        "Password must be at least 8 characters"
    );

    // Digits-only password trips the strength rule
    let (status, body) = send(
        &app,
        Method::POST,
        "/signup",
        None,
        Some(json!({"email": "jane@example.com", "password": "123456789", "name": "Jane"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["password"][0],
        "Password must contain at least one letter and one number"
    );
}

#[tokio::test]
async fn protected_routes_reject_missing_malformed_and_expired_tokens() {
    let (app, state) = test_app().await;
    let user = seed_user(&state, "jane@example.com", "passw0rd1", Role::User).await;
    let expired = expired_access_token(&user);
    let login_body = login(&app, "jane@example.com", "passw0rd1").await;
    let refresh = login_body["tokens"]["refresh_token"].as_str().unwrap();

    let routes = [
        (Method::GET, "/users".to_string()),
        (Method::POST, "/users".to_string()),
        (Method::GET, format!("/users/{}", user.id)),
        (Method::PUT, format!("/users/{}", user.id)),
        (Method::DELETE, format!("/users/{}", user.id)),
    ];

    for (method, uri) in routes {
        // No Authorization header
        let (status, body) = send(&app, method.clone(), &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} bare", method, uri);
        assert_eq!(body["code"], 401);

        // Garbage token
        let (status, _) = send(&app, method.clone(), &uri, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} garbage", method, uri);

        // Expired token
        let (status, body) = send(&app, method.clone(), &uri, Some(&expired), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} expired", method, uri);
        assert!(body["message"].as_str().unwrap().contains("expired"));

        // A refresh token is not an access token
        let (status, _) = send(&app, method.clone(), &uri, Some(refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} refresh", method, uri);
    }
}

#[tokio::test]
async fn permissions_gate_users_endpoints() {
    let (app, state) = test_app().await;
    let admin = seed_user(&state, "root@example.com", "adminpass1", Role::Admin).await;
    let user = seed_user(&state, "jane@example.com", "passw0rd1", Role::User).await;

    let admin_token = access_token(&login(&app, "root@example.com", "adminpass1").await);
    let user_token = access_token(&login(&app, "jane@example.com", "passw0rd1").await);

    // Admin can list; plain user gets 403
    let (status, body) = send(&app, Method::GET, "/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
    assert!(body["message"].as_str().unwrap().contains("users:read"));

    // Create is manage-only
    let payload = json!({
        "email": "new@example.com",
        "password": "passw0rd1",
        "name": "New",
        "role": "user"
    });
    let (status, _) = send(
        &app,
        Method::POST,
        "/users",
        Some(&user_token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, "/users", Some(&admin_token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "user");

    // Self-access works without the read permission; other records do not
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}", user.id),
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}", admin.id),
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}", user.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Users may rename themselves but not change their role
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/users/{}", user.id),
        Some(&user_token),
        Some(json!({"name": "Jane Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Jane Renamed");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/users/{}", user.id),
        Some(&user_token),
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/users/{}", admin.id),
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_token_flow_and_window() {
    let (app, state) = test_app().await;
    seed_user(&state, "jane@example.com", "passw0rd1", Role::User).await;
    let login_body = login(&app, "jane@example.com", "passw0rd1").await;
    let tokens = &login_body["tokens"];

    // Refresh lifetime is the access lifetime plus ten days
    let access_exp =
        chrono::DateTime::parse_from_rfc3339(tokens["access_expires_at"].as_str().unwrap())
            .unwrap();
    let refresh_exp =
        chrono::DateTime::parse_from_rfc3339(tokens["refresh_expires_at"].as_str().unwrap())
            .unwrap();
    assert_eq!(refresh_exp - access_exp, chrono::Duration::days(10));

    // A refresh token buys a fresh, working pair
    let refresh_token = tokens["refresh_token"].as_str().unwrap();
    let (status, new_tokens) = send(
        &app,
        Method::POST,
        "/refresh-tokens",
        None,
        Some(json!({"refresh_token": refresh_token})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = new_tokens["access_token"].as_str().unwrap();

    let me = login_body["user"]["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}", me),
        Some(new_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted for refresh
    let (status, _) = send(
        &app,
        Method::POST,
        "/refresh-tokens",
        None,
        Some(json!({"refresh_token": tokens["access_token"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nor is garbage
    let (status, _) = send(
        &app,
        Method::POST,
        "/refresh-tokens",
        None,
        Some(json!({"refresh_token": "garbage"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_fails_after_account_deletion() {
    let (app, state) = test_app().await;
    let user = seed_user(&state, "jane@example.com", "passw0rd1", Role::User).await;
    let login_body = login(&app, "jane@example.com", "passw0rd1").await;
    let refresh_token = login_body["tokens"]["refresh_token"].as_str().unwrap();
    let token = access_token(&login_body);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/users/{}", user.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/refresh-tokens",
        None,
        Some(json!({"refresh_token": refresh_token})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_semantics() {
    let (app, state) = test_app().await;
    seed_user(&state, "root@example.com", "adminpass1", Role::Admin).await;
    let victim = seed_user(&state, "jane@example.com", "passw0rd1", Role::User).await;
    let admin_token = access_token(&login(&app, "root@example.com", "adminpass1").await);

    // Unknown id is a 404
    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/users/{}", missing),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    // Malformed id is a validation failure, not a lookup miss
    let (status, body) = send(
        &app,
        Method::DELETE,
        "/users/not-a-uuid",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["userId"][0]
        .as_str()
        .unwrap()
        .contains("userId"));

    // Deleting an existing user empties the body and later reads miss
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/users/{}", victim.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}", victim.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_docs_are_public() {
    let (app, _state) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/users").is_some());
    assert!(body["paths"].get("/signup").is_some());
}
