use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use reqwest::Url;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ValidationError},
    models::{
        AddCarouselImageRequest, Carousel, CarouselRequest, CreateVideoRequest,
        PresignedUrlRequest, PresignedUrlResponse, UpdateCarouselRequest, UpdateVideoRequest,
        YoutubeVideo,
    },
    storage::sanitize_key,
};

const VIDEO_URL_MAX: usize = 500;
const VIDEO_NAME_MAX: usize = 200;

fn check_video_url(url: &str, errors: &mut ValidationError) {
    if url.len() > VIDEO_URL_MAX {
        errors.add(
            "video_url",
            format!("Ensure this field has no more than {} characters.", VIDEO_URL_MAX),
        );
        return;
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {}
        _ => errors.add("video_url", "Enter a valid URL."),
    }
}

fn check_video_name(name: &str, errors: &mut ValidationError) {
    if name.trim().is_empty() {
        errors.add("video_name", "This field may not be blank.");
    } else if name.chars().count() > VIDEO_NAME_MAX {
        errors.add(
            "video_name",
            format!("Ensure this field has no more than {} characters.", VIDEO_NAME_MAX),
        );
    }
}

// --- Videos ---

/// list_videos
#[utoipa::path(
    get,
    path = "/videos",
    responses((status = 200, description = "Videos", body = [YoutubeVideo]))
)]
pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<YoutubeVideo>> {
    Json(state.repo.list_videos().await)
}

/// get_video
#[utoipa::path(
    get,
    path = "/videos/{id}",
    params(("id" = i64, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Found", body = YoutubeVideo),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<YoutubeVideo>> {
    state
        .repo
        .get_video(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_video
///
/// [Admin Route] `video_url` must be an absolute http(s) URL.
#[utoipa::path(
    post,
    path = "/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Created", body = YoutubeVideo),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<YoutubeVideo>)> {
    auth.require_staff()?;

    payload.video_url = payload.video_url.trim().to_string();
    payload.video_name = payload.video_name.trim().to_string();
    let mut errors = ValidationError::new();
    check_video_url(&payload.video_url, &mut errors);
    check_video_name(&payload.video_name, &mut errors);
    errors.into_result()?;

    let video = state.repo.create_video(payload).await?;
    tracing::info!(video_id = video.id, "video created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// update_video
///
/// [Admin Route] Partial update, for both PUT and PATCH.
#[utoipa::path(
    patch,
    path = "/videos/{id}",
    params(("id" = i64, Path, description = "Video ID")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Updated", body = YoutubeVideo),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateVideoRequest>,
) -> ApiResult<Json<YoutubeVideo>> {
    auth.require_staff()?;

    let mut errors = ValidationError::new();
    if let Some(url) = payload.video_url.as_mut() {
        *url = url.trim().to_string();
        check_video_url(url, &mut errors);
    }
    if let Some(name) = payload.video_name.as_mut() {
        *name = name.trim().to_string();
        check_video_name(name, &mut errors);
    }
    errors.into_result()?;

    state
        .repo
        .update_video(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_video
#[utoipa::path(
    delete,
    path = "/videos/{id}",
    params(("id" = i64, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    auth.require_staff()?;
    if state.repo.delete_video(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Carousels ---

/// list_carousels
#[utoipa::path(
    get,
    path = "/carousels",
    responses((status = 200, description = "Carousels", body = [Carousel]))
)]
pub async fn list_carousels(State(state): State<AppState>) -> Json<Vec<Carousel>> {
    Json(state.repo.list_carousels().await)
}

/// get_carousel
#[utoipa::path(
    get,
    path = "/carousels/{id}",
    params(("id" = i64, Path, description = "Carousel ID")),
    responses(
        (status = 200, description = "Found", body = Carousel),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_carousel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Carousel>> {
    state
        .repo
        .get_carousel(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_carousel
#[utoipa::path(
    post,
    path = "/carousels",
    request_body = CarouselRequest,
    responses((status = 201, description = "Created", body = Carousel))
)]
pub async fn create_carousel(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CarouselRequest>,
) -> ApiResult<(StatusCode, Json<Carousel>)> {
    auth.require_staff()?;
    let carousel = state.repo.create_carousel(payload).await?;
    tracing::info!(carousel_id = carousel.id, "carousel created");
    Ok((StatusCode::CREATED, Json(carousel)))
}

/// update_carousel
///
/// [Admin Route] Replaces only the slots present in the body, for both PUT and PATCH.
/// A slot sent as `null` is emptied.
#[utoipa::path(
    patch,
    path = "/carousels/{id}",
    params(("id" = i64, Path, description = "Carousel ID")),
    request_body = UpdateCarouselRequest,
    responses(
        (status = 200, description = "Updated", body = Carousel),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_carousel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCarouselRequest>,
) -> ApiResult<Json<Carousel>> {
    auth.require_staff()?;

    let mut carousel = state.repo.get_carousel(id).await.ok_or(ApiError::NotFound)?;
    carousel.apply(payload);

    state
        .repo
        .save_carousel(&carousel)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_carousel
#[utoipa::path(
    delete,
    path = "/carousels/{id}",
    params(("id" = i64, Path, description = "Carousel ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_carousel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    auth.require_staff()?;
    if state.repo.delete_carousel(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// add_carousel_image
///
/// [Admin Route] Pushes an uploaded key into the carousel. When all four slots are
/// taken the oldest image is evicted and its object removed from storage.
#[utoipa::path(
    post,
    path = "/carousels/{id}/images",
    params(("id" = i64, Path, description = "Carousel ID")),
    request_body = AddCarouselImageRequest,
    responses(
        (status = 200, description = "Image added", body = Carousel),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_carousel_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddCarouselImageRequest>,
) -> ApiResult<Json<Carousel>> {
    auth.require_staff()?;

    let key = payload.image.trim().to_string();
    if key.is_empty() {
        return Err(ValidationError::field("image", "No file was submitted.").into());
    }

    let mut carousel = state.repo.get_carousel(id).await.ok_or(ApiError::NotFound)?;
    let evicted = carousel.add_image(key);

    let saved = state
        .repo
        .save_carousel(&carousel)
        .await?
        .ok_or(ApiError::NotFound)?;

    // The slot change is already persisted; a failed delete only leaves an orphan object.
    if let Some(old_key) = evicted {
        match state.storage.delete_object(&old_key).await {
            Ok(()) => tracing::info!(carousel_id = id, key = %old_key, "evicted carousel image"),
            Err(e) => tracing::warn!(carousel_id = id, key = %old_key, "evicted image not deleted: {}", e),
        }
    }

    Ok(Json(saved))
}

// --- Uploads ---

/// get_presigned_url
///
/// [Authenticated Route] Short-lived (10 minute) URL for uploading straight to
/// object storage, constrained to `file_type`. The key prefix follows `purpose`;
/// avatars and logos live under the caller's id.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Missing file type"),
        (status = 502, description = "Storage unavailable")
    )
)]
pub async fn get_presigned_url(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let file_type = payload.file_type.trim();
    if file_type.is_empty() {
        return Err(ValidationError::field("file_type", "This field may not be blank.").into());
    }

    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");

    let prefix = payload.purpose.key_prefix(auth.id);
    let object_key = sanitize_key(&format!("{}/{}.{}", prefix, Uuid::new_v4(), extension));

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, file_type)
        .await?;

    tracing::debug!(user_id = %auth.id, key = %object_key, "presigned upload issued");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
