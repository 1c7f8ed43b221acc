use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{ConflictField, map_conflict, non_blank, user_response};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ValidationError},
    identity::normalize_email,
    models::{UpdateUserRequest, UserFilter, UserResponse},
    repository::constraints,
};

const USERNAME_MAX: usize = 150;
const PHONE_MAX: usize = 15;

pub(crate) const USER_CONFLICTS: &[ConflictField] = &[
    ConflictField {
        constraint: constraints::USERNAME_UNIQUE,
        field: "username",
        message: "A user with that username already exists.",
    },
    ConflictField {
        constraint: constraints::EMAIL_UNIQUE,
        field: "email",
        message: "user with this email already exists.",
    },
    ConflictField {
        constraint: constraints::PHONE_UNIQUE,
        field: "phone",
        message: "user with this phone already exists.",
    },
];

// Usernames must never look like an email or a phone number, otherwise login by
// username would be routed to the wrong lookup.
pub(crate) fn check_username(username: &str, errors: &mut ValidationError) {
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > USERNAME_MAX {
        errors.add(
            "username",
            format!("Ensure this field has no more than {} characters.", USERNAME_MAX),
        );
    } else if username.contains('@') || username.bytes().all(|b| b.is_ascii_digit()) {
        errors.add(
            "username",
            "Username may not contain '@' or consist only of digits.",
        );
    }
}

pub(crate) fn check_email(email: &str, errors: &mut ValidationError) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}

pub(crate) fn check_phone(phone: &str, errors: &mut ValidationError) {
    if !phone.bytes().all(|b| b.is_ascii_digit()) {
        errors.add("phone", "Enter a valid phone number.");
    } else if phone.len() > PHONE_MAX {
        errors.add(
            "phone",
            format!("Ensure this field has no more than {} characters.", PHONE_MAX),
        );
    }
}

/// Normalizes a partial user update in place. Blank email/phone/image values are
/// dropped, so an update can never clear them.
fn validate_user_update(req: &mut UpdateUserRequest) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    if let Some(username) = req.username.as_mut() {
        *username = username.trim().to_string();
        check_username(username, &mut errors);
    }

    req.email = non_blank(req.email.take()).map(|e| normalize_email(&e));
    if let Some(email) = &req.email {
        check_email(email, &mut errors);
    }

    req.phone = non_blank(req.phone.take());
    if let Some(phone) = &req.phone {
        check_phone(phone, &mut errors);
    }

    req.profile_image = non_blank(req.profile_image.take());
    req.logo = non_blank(req.logo.take());

    errors.into_result()
}

/// get_profile
///
/// [Authenticated Route] The caller's own record, subscription included.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.repo.get_user(auth.id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(user_response(&state, user).await))
}

/// update_profile
///
/// [Authenticated Route] Partial update of the caller's own record, for both PUT and
/// PATCH. `is_active` and `is_staff` cannot be changed here.
#[utoipa::path(
    patch,
    path = "/profile",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    payload.is_active = None;
    payload.is_staff = None;
    validate_user_update(&mut payload)?;

    let user = state
        .repo
        .update_user(auth.id, payload)
        .await
        .map_err(|e| map_conflict(e, USER_CONFLICTS))?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(user_id = %auth.id, "profile updated");
    Ok(Json(user_response(&state, user).await))
}

/// list_users
///
/// [Admin Route] All users, optionally filtered by exact `id`, `username`, `email`
/// or `phone`.
#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Not staff")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    auth.require_staff()?;

    let users = state.repo.list_users(&filter).await;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(user_response(&state, user).await);
    }
    Ok(Json(responses))
}

/// get_user
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    auth.require_staff()?;
    let user = state.repo.get_user(id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(user_response(&state, user).await))
}

/// update_user
///
/// [Admin Route] Partial update of any user, including activation and staff status.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    auth.require_staff()?;
    validate_user_update(&mut payload)?;

    let user = state
        .repo
        .update_user(id, payload)
        .await
        .map_err(|e| map_conflict(e, USER_CONFLICTS))?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(user_id = %id, staff_id = %auth.id, "user updated by staff");
    Ok(Json(user_response(&state, user).await))
}

/// delete_user
///
/// [Admin Route] Removes a user. Their subscription and images go with them.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require_staff()?;

    if state.repo.delete_user(id).await {
        tracing::info!(user_id = %id, staff_id = %auth.id, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
