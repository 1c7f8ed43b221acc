use crate::{
    AppState,
    handlers::{auth, catalog, media},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: health check, the identity gateway and read access to
/// the catalogs shown on the public site.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Identity gateway ---
        .route("/signup", post(auth::register_user))
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh_token))
        // --- Catalog reads ---
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{id}", get(catalog::get_category))
        // GET /subcategories?category=...
        .route("/subcategories", get(catalog::list_subcategories))
        .route("/subcategories/{id}", get(catalog::get_subcategory))
        // GET /images?category=...&subcategory=...&user=...
        .route("/images", get(catalog::list_images))
        .route("/images/{id}", get(catalog::get_image))
        .route("/videos", get(media::list_videos))
        .route("/videos/{id}", get(media::get_video))
        .route("/carousels", get(media::list_carousels))
        .route("/carousels/{id}", get(media::get_carousel))
}
