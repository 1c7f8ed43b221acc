mod common;

use advertising_backend::{
    AppState, FixedClock, MockStorageService,
    auth::{AuthUser, Claims, TokenKind, decode_token, issue_token},
    config::{AppConfig, Env},
    error::ApiError,
    models::{NewUser, UpdateUserRequest},
    repository::Repository,
};
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::NaiveDate;
use common::InMemoryRepository;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn test_config(env: Env) -> AppConfig {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config
}

async fn app_state_with_user(env: Env, is_staff: bool) -> (AppState, Arc<InMemoryRepository>, Uuid) {
    let repo = Arc::new(InMemoryRepository::new());
    let user = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            username: "ana".into(),
            email: Some("ana@example.com".into()),
            password_hash: "unused".into(),
            is_staff,
            ..Default::default()
        })
        .await
        .unwrap();

    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(MockStorageService::new()),
        clock: Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
        config: test_config(env),
    };
    (state, repo, user.id)
}

fn signed_token(sub: Uuid, kind: TokenKind, exp: usize, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub,
        iat: now,
        exp,
        token_type: kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn unauthorized_message(result: Result<AuthUser, ApiError>) -> String {
    match result {
        Err(ApiError::Unauthorized(msg)) => msg,
        other => panic!("expected 401, got {:?}", other),
    }
}

// --- Token issuing ---

#[test]
fn test_issue_and_decode_roundtrip() {
    let config = test_config(Env::Production);
    let user_id = Uuid::new_v4();

    let access = issue_token(&config, user_id, TokenKind::Access).unwrap();
    let claims = decode_token(&config, &access, TokenKind::Access).unwrap();

    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.token_type, TokenKind::Access);
    assert_eq!(claims.exp - claims.iat, config.access_token_ttl_secs as usize);

    let refresh = issue_token(&config, user_id, TokenKind::Refresh).unwrap();
    let claims = decode_token(&config, &refresh, TokenKind::Refresh).unwrap();
    assert_eq!(claims.exp - claims.iat, config.refresh_token_ttl_secs as usize);
}

#[test]
fn test_decode_rejects_wrong_kind() {
    let config = test_config(Env::Production);
    let refresh = issue_token(&config, Uuid::new_v4(), TokenKind::Refresh).unwrap();

    let err = decode_token(&config, &refresh, TokenKind::Access).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token has wrong type."));
}

#[test]
fn test_decode_rejects_foreign_signature() {
    let config = test_config(Env::Production);
    let token = signed_token(Uuid::new_v4(), TokenKind::Access, usize::MAX / 2, "other-secret");

    let err = decode_token(&config, &token, TokenKind::Access).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token is invalid."));
}

#[test]
fn test_decode_rejects_expired_token() {
    let config = test_config(Env::Production);
    // Well past the default validation leeway.
    let token = signed_token(Uuid::new_v4(), TokenKind::Access, 1_000, TEST_JWT_SECRET);

    let err = decode_token(&config, &token, TokenKind::Access).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token has expired."));
}

// --- Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let (state, _, user_id) = app_state_with_user(Env::Production, false).await;
    let token = issue_token(&state.config, user_id, TokenKind::Access).unwrap();

    let mut parts = with_bearer(&token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(
        auth_user,
        AuthUser {
            id: user_id,
            is_staff: false
        }
    );
}

#[tokio::test]
async fn test_auth_carries_staff_flag_from_store() {
    let (state, _, user_id) = app_state_with_user(Env::Production, true).await;
    let token = issue_token(&state.config, user_id, TokenKind::Access).unwrap();

    let mut parts = with_bearer(&token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert!(auth_user.is_staff);
    assert!(auth_user.require_staff().is_ok());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let (state, _, _) = app_state_with_user(Env::Production, false).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(
        unauthorized_message(result),
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let (state, _, user_id) = app_state_with_user(Env::Production, false).await;
    let token = issue_token(&state.config, user_id, TokenKind::Access).unwrap();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Token {}", token)).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_auth_rejects_refresh_token() {
    let (state, _, user_id) = app_state_with_user(Env::Production, false).await;
    let refresh = issue_token(&state.config, user_id, TokenKind::Refresh).unwrap();

    let mut parts = with_bearer(&refresh);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(unauthorized_message(result), "Token has wrong type.");
}

#[tokio::test]
async fn test_auth_rejects_expired_jwt() {
    let (state, _, user_id) = app_state_with_user(Env::Production, false).await;
    let token = signed_token(user_id, TokenKind::Access, 1_000, TEST_JWT_SECRET);

    let mut parts = with_bearer(&token);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    let err = result.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_rejects_deactivated_user() {
    let (state, repo, user_id) = app_state_with_user(Env::Production, false).await;
    let token = issue_token(&state.config, user_id, TokenKind::Access).unwrap();

    repo.update_user(
        user_id,
        UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut parts = with_bearer(&token);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(unauthorized_message(result), "User not found or inactive.");
}

#[tokio::test]
async fn test_auth_rejects_deleted_user() {
    let (state, repo, user_id) = app_state_with_user(Env::Production, false).await;
    let token = issue_token(&state.config, user_id, TokenKind::Access).unwrap();
    assert!(repo.delete_user(user_id).await);

    let mut parts = with_bearer(&token);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(unauthorized_message(result), "User not found or inactive.");
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_bypass_success() {
    let (state, _, user_id) = app_state_with_user(Env::Local, true).await;

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth_user.id, user_id);
    assert!(auth_user.is_staff);
}

#[tokio::test]
async fn test_local_bypass_unknown_user_falls_through_to_token() {
    let (state, _, _) = app_state_with_user(Env::Local, false).await;

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(
        unauthorized_message(result),
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let (state, _, user_id) = app_state_with_user(Env::Production, false).await;

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

// --- Ownership helpers ---

#[test]
fn test_can_act_on() {
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let user = AuthUser {
        id: owner,
        is_staff: false,
    };
    assert!(user.can_act_on(owner));
    assert!(!user.can_act_on(other));
    assert!(matches!(user.require_staff(), Err(ApiError::Forbidden)));

    let staff = AuthUser {
        id: other,
        is_staff: true,
    };
    assert!(staff.can_act_on(owner));
}
