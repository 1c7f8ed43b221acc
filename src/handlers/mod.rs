/// Handler Module Index
///
/// Request handlers grouped by resource. Every handler returns `ApiResult`, so
/// failures reach the client through `ApiError::into_response`.

/// Signup, login and token refresh.
pub mod auth;

/// Categories, subcategories and uploaded images.
pub mod catalog;

/// Videos, carousels and presigned uploads.
pub mod media;

/// Entitlement lifecycle endpoints.
pub mod subscriptions;

/// Own profile and staff user administration.
pub mod users;

use crate::{
    AppState,
    error::{ApiError, RepositoryError, ValidationError},
    models::{User, UserResponse},
};

/// A known constraint, and the field error reported when a write trips it.
pub(crate) struct ConflictField {
    pub constraint: &'static str,
    pub field: &'static str,
    pub message: &'static str,
}

/// Turns a constraint conflict into a field error when the constraint is listed.
/// Anything else is an internal failure.
pub(crate) fn map_conflict(err: RepositoryError, known: &[ConflictField]) -> ApiError {
    if let RepositoryError::Conflict(constraint) = &err {
        if let Some(hit) = known.iter().find(|k| k.constraint == constraint.as_str()) {
            return ValidationError::field(hit.field, hit.message).into();
        }
    }
    err.into()
}

/// Trims `value` and treats blank as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Representation of `user` with its subscription evaluated against today.
pub(crate) async fn user_response(state: &AppState, user: User) -> UserResponse {
    let today = state.clock.today();
    let subscription = state
        .repo
        .get_subscription_for_user(user.id)
        .await
        .map(|s| s.to_response(today));
    UserResponse::from_user(user, subscription)
}
