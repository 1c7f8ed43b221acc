use crate::{
    AppState,
    handlers::{catalog, media, subscriptions, users},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Endpoints for any active user. Ownership is checked in the handlers: non-staff
/// callers only reach their own images and subscriptions.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT/PATCH /profile
        // The caller's own record. PUT and PATCH are both partial updates.
        .route(
            "/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .patch(users::update_profile),
        )
        // POST /upload/presigned
        // Ten-minute presigned PUT URL for direct upload to object storage.
        .route("/upload/presigned", post(media::get_presigned_url))
        // --- Images (owner-scoped writes) ---
        .route("/images", post(catalog::create_image))
        .route(
            "/images/{id}",
            put(catalog::update_image)
                .patch(catalog::update_image)
                .delete(catalog::delete_image),
        )
        // --- Subscriptions ---
        // Staff see and manage every record; others only their own (403 otherwise).
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get_subscription)
                .put(subscriptions::update_subscription)
                .patch(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        )
}
