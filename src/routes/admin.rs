use crate::{
    AppState,
    handlers::{catalog, media, users},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Staff-only endpoints: user administration and every catalog write. Paths are
/// shared with the public read routes; only the write methods live here.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- User administration ---
        // GET /users?id=...&username=...&email=...&phone=...
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // --- Categories ---
        .route("/categories", post(catalog::create_category))
        .route(
            "/categories/{id}",
            put(catalog::update_category)
                .patch(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route("/subcategories", post(catalog::create_subcategory))
        .route(
            "/subcategories/{id}",
            put(catalog::update_subcategory)
                .patch(catalog::update_subcategory)
                .delete(catalog::delete_subcategory),
        )
        // --- Videos ---
        .route("/videos", post(media::create_video))
        .route(
            "/videos/{id}",
            put(media::update_video)
                .patch(media::update_video)
                .delete(media::delete_video),
        )
        // --- Carousels ---
        .route("/carousels", post(media::create_carousel))
        .route(
            "/carousels/{id}",
            put(media::update_carousel)
                .patch(media::update_carousel)
                .delete(media::delete_carousel),
        )
        // POST /carousels/{id}/images
        // Rotates a new image in, evicting the oldest once all four slots are full.
        .route("/carousels/{id}/images", post(media::add_carousel_image))
}
