use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{ConflictField, map_conflict};
use crate::{
    AppState,
    auth::AuthUser,
    entitlement::Entitlement,
    error::{ApiError, ApiResult, RepositoryError},
    models::{
        CreateSubscriptionRequest, NewSubscription, Subscription, SubscriptionResponse,
        UpdateSubscriptionRequest,
    },
    repository::constraints,
};

const SUBSCRIPTION_CONFLICTS: &[ConflictField] = &[ConflictField {
    constraint: constraints::SUBSCRIPTION_USER_UNIQUE,
    field: "user_id",
    message: "subscription with this user already exists.",
}];

/// Loads subscription `id` if the caller may see it: 404 when missing, 403 when
/// it belongs to someone else and the caller is not staff.
async fn load_scoped(state: &AppState, auth: &AuthUser, id: i64) -> ApiResult<Subscription> {
    let subscription = state
        .repo
        .get_subscription(id)
        .await
        .ok_or(ApiError::NotFound)?;

    if !auth.can_act_on(subscription.user_id) {
        tracing::warn!(
            subscription_id = id,
            user_id = %auth.id,
            "access to another user's subscription denied"
        );
        return Err(ApiError::Forbidden);
    }
    Ok(subscription)
}

/// list_subscriptions
///
/// [Authenticated Route] Staff see every subscription; everyone else only their own.
#[utoipa::path(
    get,
    path = "/subscriptions",
    responses((status = 200, description = "Subscriptions", body = [SubscriptionResponse]))
)]
pub async fn list_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<SubscriptionResponse>> {
    let owner = if auth.is_staff { None } else { Some(auth.id) };
    let today = state.clock.today();

    let subscriptions = state.repo.list_subscriptions(owner).await;
    Json(subscriptions.iter().map(|s| s.to_response(today)).collect())
}

/// create_subscription
///
/// [Authenticated Route] Links a plan to a user, one subscription per user.
///
/// Either `plan` or `revoked: true` is required; revocation wins when both are
/// given. `start_date` defaults to today. Non-staff may only subscribe themselves.
#[utoipa::path(
    post,
    path = "/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Created", body = SubscriptionResponse),
        (status = 400, description = "Missing/invalid plan or user already subscribed"),
        (status = 403, description = "Not staff and not self"),
        (status = 404, description = "User not found")
    )
)]
pub async fn create_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    if !auth.can_act_on(payload.user_id) {
        return Err(ApiError::Forbidden);
    }
    if state.repo.get_user(payload.user_id).await.is_none() {
        return Err(ApiError::NotFound);
    }

    let today = state.clock.today();
    let entitlement = Entitlement::create(&payload.change(), today)?;

    let subscription = state
        .repo
        .create_subscription(NewSubscription {
            user_id: payload.user_id,
            entitlement,
        })
        .await
        .map_err(|e| match e {
            // The owner was deleted between the lookup and the insert.
            RepositoryError::Conflict(ref c) if c == constraints::SUBSCRIPTION_USER_FK => {
                ApiError::NotFound
            }
            other => map_conflict(other, SUBSCRIPTION_CONFLICTS),
        })?;

    tracing::info!(
        subscription_id = subscription.id,
        user_id = %subscription.user_id,
        plan = ?subscription.entitlement.plan,
        revoked = subscription.entitlement.revoked,
        "subscription created"
    );
    Ok((StatusCode::CREATED, Json(subscription.to_response(today))))
}

/// get_subscription
#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    params(("id" = i64, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Found", body = SubscriptionResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = load_scoped(&state, &auth, id).await?;
    Ok(Json(subscription.to_response(state.clock.today())))
}

/// update_subscription
///
/// [Authenticated Route] Partial update, for both PUT and PATCH.
///
/// `revoked: true` clears plan and dates. A new plan keeps the current
/// `start_date` (or starts today after a revocation) and re-derives `end_date`.
#[utoipa::path(
    patch,
    path = "/subscriptions/{id}",
    params(("id" = i64, Path, description = "Subscription ID")),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Updated", body = SubscriptionResponse),
        (status = 400, description = "Invalid plan"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = load_scoped(&state, &auth, id).await?;
    let today = state.clock.today();

    let mut entitlement = subscription.entitlement;
    entitlement.update(&payload.change(), today)?;

    let saved = state
        .repo
        .save_subscription(id, &entitlement)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(
        subscription_id = id,
        user_id = %auth.id,
        plan = ?saved.entitlement.plan,
        revoked = saved.entitlement.revoked,
        "subscription updated"
    );
    Ok(Json(saved.to_response(today)))
}

/// delete_subscription
#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    params(("id" = i64, Path, description = "Subscription ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    load_scoped(&state, &auth, id).await?;

    if state.repo.delete_subscription(id).await {
        tracing::info!(subscription_id = id, user_id = %auth.id, "subscription deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
