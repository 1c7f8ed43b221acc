use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{ConflictField, map_conflict};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ValidationError},
    models::{
        Category, CategoryRequest, CreateImageRequest, CreateSubCategoryRequest, ImageFilter,
        ImageUpload, NewImage, SubCategory, SubCategoryFilter, UpdateImageRequest,
        UpdateSubCategoryRequest,
    },
    repository::constraints,
};

const NAME_MAX: usize = 100;

const CATEGORY_CONFLICTS: &[ConflictField] = &[ConflictField {
    constraint: constraints::CATEGORY_NAME_UNIQUE,
    field: "name",
    message: "category with this name already exists.",
}];

const SUBCATEGORY_CONFLICTS: &[ConflictField] = &[
    ConflictField {
        constraint: constraints::SUBCATEGORY_NAME_UNIQUE,
        field: "non_field_errors",
        message: "The fields category, name must make a unique set.",
    },
    ConflictField {
        constraint: constraints::SUBCATEGORY_CATEGORY_FK,
        field: "category",
        message: "Invalid category - object does not exist.",
    },
];

const IMAGE_CONFLICTS: &[ConflictField] = &[
    ConflictField {
        constraint: constraints::IMAGE_CATEGORY_FK,
        field: "category",
        message: "Invalid category - object does not exist.",
    },
    ConflictField {
        constraint: constraints::IMAGE_SUBCATEGORY_FK,
        field: "subcategory",
        message: "Invalid subcategory - object does not exist.",
    },
];

fn clean_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::field("name", "This field may not be blank."));
    }
    if name.chars().count() > NAME_MAX {
        return Err(ValidationError::field(
            "name",
            format!("Ensure this field has no more than {} characters.", NAME_MAX),
        ));
    }
    Ok(name.to_string())
}

// --- Categories ---

/// list_categories
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.repo.list_categories().await)
}

/// get_category
#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    state
        .repo
        .get_category(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_category
///
/// [Admin Route] Names are unique across categories.
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Blank or duplicate name")
    )
)]
pub async fn create_category(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    auth.require_staff()?;
    let name = clean_name(&payload.name)?;

    let category = state
        .repo
        .create_category(name)
        .await
        .map_err(|e| map_conflict(e, CATEGORY_CONFLICTS))?;

    tracing::info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// update_category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    auth.require_staff()?;
    let name = clean_name(&payload.name)?;

    state
        .repo
        .update_category(id, name)
        .await
        .map_err(|e| map_conflict(e, CATEGORY_CONFLICTS))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_category
///
/// [Admin Route] Cascades to the category's subcategories and images.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    auth.require_staff()?;
    if state.repo.delete_category(id).await {
        tracing::info!(category_id = id, "category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Subcategories ---

/// list_subcategories
///
/// [Public Route] Optionally restricted to one parent `category`.
#[utoipa::path(
    get,
    path = "/subcategories",
    params(SubCategoryFilter),
    responses((status = 200, description = "Subcategories", body = [SubCategory]))
)]
pub async fn list_subcategories(
    State(state): State<AppState>,
    Query(filter): Query<SubCategoryFilter>,
) -> Json<Vec<SubCategory>> {
    Json(state.repo.list_subcategories(filter.category).await)
}

/// get_subcategory
#[utoipa::path(
    get,
    path = "/subcategories/{id}",
    params(("id" = i64, Path, description = "Subcategory ID")),
    responses(
        (status = 200, description = "Found", body = SubCategory),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_subcategory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SubCategory>> {
    state
        .repo
        .get_subcategory(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_subcategory
///
/// [Admin Route] Names are unique within their parent category.
#[utoipa::path(
    post,
    path = "/subcategories",
    request_body = CreateSubCategoryRequest,
    responses(
        (status = 201, description = "Created", body = SubCategory),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_subcategory(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubCategoryRequest>,
) -> ApiResult<(StatusCode, Json<SubCategory>)> {
    auth.require_staff()?;
    let name = clean_name(&payload.name)?;

    let subcategory = state
        .repo
        .create_subcategory(payload.category, name)
        .await
        .map_err(|e| map_conflict(e, SUBCATEGORY_CONFLICTS))?;

    tracing::info!(subcategory_id = subcategory.id, "subcategory created");
    Ok((StatusCode::CREATED, Json(subcategory)))
}

/// update_subcategory
///
/// [Admin Route] Partial update, for both PUT and PATCH.
#[utoipa::path(
    patch,
    path = "/subcategories/{id}",
    params(("id" = i64, Path, description = "Subcategory ID")),
    request_body = UpdateSubCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = SubCategory),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_subcategory(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateSubCategoryRequest>,
) -> ApiResult<Json<SubCategory>> {
    auth.require_staff()?;
    if let Some(name) = payload.name.as_deref() {
        payload.name = Some(clean_name(name)?);
    }

    state
        .repo
        .update_subcategory(id, payload)
        .await
        .map_err(|e| map_conflict(e, SUBCATEGORY_CONFLICTS))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_subcategory
#[utoipa::path(
    delete,
    path = "/subcategories/{id}",
    params(("id" = i64, Path, description = "Subcategory ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_subcategory(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    auth.require_staff()?;
    if state.repo.delete_subcategory(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Images ---

/// The subcategory must exist and hang off `category_id`.
async fn check_image_placement(
    state: &AppState,
    category_id: i64,
    subcategory_id: i64,
) -> Result<(), ValidationError> {
    if state.repo.get_category(category_id).await.is_none() {
        return Err(ValidationError::field(
            "category",
            "Invalid category - object does not exist.",
        ));
    }
    match state.repo.get_subcategory(subcategory_id).await {
        None => Err(ValidationError::field(
            "subcategory",
            "Invalid subcategory - object does not exist.",
        )),
        Some(sub) if sub.category_id != category_id => Err(ValidationError::field(
            "subcategory",
            "Subcategory does not belong to the selected category.",
        )),
        Some(_) => Ok(()),
    }
}

/// list_images
///
/// [Public Route] Newest first. Filters: `id`, `category`, `subcategory`, `user`.
#[utoipa::path(
    get,
    path = "/images",
    params(ImageFilter),
    responses((status = 200, description = "Images", body = [ImageUpload]))
)]
pub async fn list_images(
    State(state): State<AppState>,
    Query(filter): Query<ImageFilter>,
) -> Json<Vec<ImageUpload>> {
    Json(state.repo.list_images(&filter).await)
}

/// get_image
#[utoipa::path(
    get,
    path = "/images/{id}",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Found", body = ImageUpload),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ImageUpload>> {
    state
        .repo
        .get_image(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_image
///
/// [Authenticated Route] Registers an uploaded object under a category and
/// subcategory. The caller becomes the owner.
#[utoipa::path(
    post,
    path = "/images",
    request_body = CreateImageRequest,
    responses(
        (status = 201, description = "Created", body = ImageUpload),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateImageRequest>,
) -> ApiResult<(StatusCode, Json<ImageUpload>)> {
    let image = payload.image.trim().to_string();
    if image.is_empty() {
        return Err(ValidationError::field("image", "No file was submitted.").into());
    }
    check_image_placement(&state, payload.category, payload.subcategory).await?;

    let created = state
        .repo
        .create_image(NewImage {
            user_id: Some(auth.id),
            category_id: payload.category,
            subcategory_id: payload.subcategory,
            image,
        })
        .await
        .map_err(|e| map_conflict(e, IMAGE_CONFLICTS))?;

    tracing::info!(image_id = created.id, user_id = %auth.id, "image created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_image
///
/// [Authenticated Route] Partial update, for both PUT and PATCH. Non-staff may only
/// touch their own images.
#[utoipa::path(
    patch,
    path = "/images/{id}",
    params(("id" = i64, Path, description = "Image ID")),
    request_body = UpdateImageRequest,
    responses(
        (status = 200, description = "Updated", body = ImageUpload),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateImageRequest>,
) -> ApiResult<Json<ImageUpload>> {
    let current = state.repo.get_image(id).await.ok_or(ApiError::NotFound)?;
    if !auth.is_staff && current.user_id != Some(auth.id) {
        return Err(ApiError::Forbidden);
    }

    if let Some(image) = payload.image.as_deref() {
        let image = image.trim();
        if image.is_empty() {
            return Err(ValidationError::field("image", "No file was submitted.").into());
        }
        payload.image = Some(image.to_string());
    }

    if payload.category.is_some() || payload.subcategory.is_some() {
        check_image_placement(
            &state,
            payload.category.unwrap_or(current.category_id),
            payload.subcategory.unwrap_or(current.subcategory_id),
        )
        .await?;
    }

    state
        .repo
        .update_image(id, payload)
        .await
        .map_err(|e| map_conflict(e, IMAGE_CONFLICTS))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_image
#[utoipa::path(
    delete,
    path = "/images/{id}",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let current = state.repo.get_image(id).await.ok_or(ApiError::NotFound)?;
    if !auth.is_staff && current.user_id != Some(auth.id) {
        return Err(ApiError::Forbidden);
    }

    if state.repo.delete_image(id).await {
        tracing::info!(image_id = id, user_id = %auth.id, "image deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
