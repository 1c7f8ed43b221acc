use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Domain rules, free of I/O.
pub mod entitlement;
pub mod identity;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use clock::{ClockState, FixedClock, SystemClock};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register_user, handlers::auth::login, handlers::auth::refresh_token,
        handlers::users::get_profile, handlers::users::update_profile,
        handlers::users::list_users, handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user,
        handlers::catalog::list_categories, handlers::catalog::get_category,
        handlers::catalog::create_category, handlers::catalog::update_category,
        handlers::catalog::delete_category,
        handlers::catalog::list_subcategories, handlers::catalog::get_subcategory,
        handlers::catalog::create_subcategory, handlers::catalog::update_subcategory,
        handlers::catalog::delete_subcategory,
        handlers::catalog::list_images, handlers::catalog::get_image,
        handlers::catalog::create_image, handlers::catalog::update_image,
        handlers::catalog::delete_image,
        handlers::media::list_videos, handlers::media::get_video, handlers::media::create_video,
        handlers::media::update_video, handlers::media::delete_video,
        handlers::media::list_carousels, handlers::media::get_carousel,
        handlers::media::create_carousel, handlers::media::update_carousel,
        handlers::media::delete_carousel, handlers::media::add_carousel_image,
        handlers::media::get_presigned_url,
        handlers::subscriptions::list_subscriptions, handlers::subscriptions::create_subscription,
        handlers::subscriptions::get_subscription, handlers::subscriptions::update_subscription,
        handlers::subscriptions::delete_subscription
    ),
    components(
        schemas(
            models::UserResponse, models::RegisterUserRequest, models::LoginRequest,
            models::LoginResponse, models::RefreshRequest, models::RefreshResponse,
            models::UpdateUserRequest, models::Category, models::CategoryRequest,
            models::SubCategory, models::CreateSubCategoryRequest,
            models::UpdateSubCategoryRequest, models::ImageUpload, models::CreateImageRequest,
            models::UpdateImageRequest, models::VideoCategory, models::YoutubeVideo,
            models::CreateVideoRequest, models::UpdateVideoRequest, models::Carousel,
            models::CarouselRequest, models::UpdateCarouselRequest,
            models::AddCarouselImageRequest,
            models::SubscriptionResponse, models::CreateSubscriptionRequest,
            models::UpdateSubscriptionRequest, models::UploadPurpose,
            models::PresignedUrlRequest, models::PresignedUrlResponse, entitlement::Plan,
        )
    ),
    tags(
        (name = "advertising-backend", description = "Advertising admin API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Object storage for uploads and presigned URLs.
    pub storage: StorageState,
    /// Source of "today" for entitlement rules.
    pub clock: ClockState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for ClockState {
    fn from_ref(app_state: &AppState) -> ClockState {
        app_state.clock.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles public, authenticated and admin routes, the access layers for each, the
/// Swagger UI and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Authenticated routes: 401 without a valid access token.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::auth_middleware,
            )),
        )
        // Admin routes: 401 unauthenticated, 403 for non-staff.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::staff_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the request id, so every log line of one request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
