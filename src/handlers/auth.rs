use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use super::{
    map_conflict, non_blank, user_response,
    users::{USER_CONFLICTS, check_email, check_phone, check_username},
};
use crate::{
    AppState,
    auth::{TokenKind, decode_token, issue_token},
    error::{ApiError, ApiResult, ValidationError},
    identity::{IdentifierKind, hash_password, normalize_email, verify_password},
    models::{
        LoginRequest, LoginResponse, NewUser, RefreshRequest, RefreshResponse,
        RegisterUserRequest, UserResponse,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const USER_INACTIVE: &str = "User is inactive";

/// validate_registration
///
/// Checks a signup payload and returns it normalized: trimmed username, blank
/// contact fields dropped, email domain lower-cased.
pub fn validate_registration(
    req: RegisterUserRequest,
) -> Result<RegisterUserRequest, ValidationError> {
    let mut errors = ValidationError::new();

    let username = req.username.trim().to_string();
    check_username(&username, &mut errors);

    let email = non_blank(req.email).map(|e| normalize_email(&e));
    let phone = non_blank(req.phone);

    match (&email, &phone) {
        (None, None) => errors.add(
            "non_field_errors",
            "Either email or phone number is required",
        ),
        _ => {
            if let Some(email) = &email {
                check_email(email, &mut errors);
            }
            if let Some(phone) = &phone {
                check_phone(phone, &mut errors);
            }
        }
    }

    if req.password.is_empty() {
        errors.add("password", "This field may not be blank.");
    }

    errors.into_result()?;

    Ok(RegisterUserRequest {
        username,
        email,
        phone,
        password: req.password,
        profile_image: non_blank(req.profile_image),
        logo: non_blank(req.logo),
    })
}

/// register_user
///
/// [Public Route] Creates a user with an argon2id-hashed password.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate username/email/phone")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let req = validate_registration(payload)?;
    let password_hash = hash_password(&req.password).await?;

    let user = state
        .repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            username: req.username,
            email: req.email,
            phone: req.phone,
            password_hash,
            profile_image: req.profile_image,
            logo: req.logo,
            is_staff: false,
        })
        .await
        .map_err(|e| map_conflict(e, USER_CONFLICTS))?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user_response(&state, user).await)))
}

/// login
///
/// [Public Route] Authenticates by username, email or phone number and returns an
/// access/refresh token pair.
///
/// The identifier is classified first, then looked up on the matching unique key,
/// then the password is checked. Only an inactive account with the right password
/// gets a distinct message.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid credentials or inactive user")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let identifier = payload.identifier.trim();
    let kind = IdentifierKind::classify(identifier);
    let lookup = match kind {
        IdentifierKind::Email => normalize_email(identifier),
        _ => identifier.to_string(),
    };

    let invalid = || ApiError::from(ValidationError::field("non_field_errors", INVALID_CREDENTIALS));

    let Some(user) = state.repo.find_user_by(kind, &lookup).await else {
        tracing::debug!(kind = kind.column(), "login for unknown identifier");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ValidationError::field("non_field_errors", USER_INACTIVE).into());
    }

    let access = issue_token(&state.config, user.id, TokenKind::Access)?;
    let refresh = issue_token(&state.config, user.id, TokenKind::Refresh)?;

    tracing::info!(user_id = %user.id, kind = kind.column(), "user logged in");
    Ok(Json(LoginResponse {
        user: user_response(&state, user).await,
        refresh,
        access,
    }))
}

/// refresh_token
///
/// [Public Route] Exchanges a refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = decode_token(&state.config, &payload.refresh, TokenKind::Refresh)?;

    let user = state
        .repo
        .get_user(claims.sub)
        .await
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive.".into()))?;

    let access = issue_token(&state.config, user.id, TokenKind::Access)?;
    Ok(Json(RefreshResponse { access }))
}
