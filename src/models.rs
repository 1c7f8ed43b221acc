use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entitlement::{Entitlement, EntitlementChange, Plan};

// --- Identity ---

/// User
///
/// Row of the `users` table. Never serialized directly: `password_hash` must not
/// leave the server, so responses go through `UserResponse`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    // Object keys in the upload bucket.
    pub profile_image: Option<String>,
    pub logo: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Fully validated insert payload, password already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub logo: Option<String>,
    pub is_staff: bool,
}

/// UserResponse
///
/// Public representation of a user, embedding the subscription when one exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub profile_image: Option<String>,
    pub logo: Option<String>,
    pub subscription: Option<SubscriptionResponse>,
}

impl UserResponse {
    pub fn from_user(user: User, subscription: Option<SubscriptionResponse>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            phone: user.phone,
            email: user.email,
            is_active: user.is_active,
            is_staff: user.is_staff,
            profile_image: user.profile_image,
            logo: user.logo,
            subscription,
        }
    }
}

/// RegisterUserRequest
///
/// Input payload for `POST /signup`. At least one of `email` / `phone` is required.
/// There is no role field: signup always creates a non-staff user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// LoginRequest
///
/// `identifier` may be a username, an email address or a phone number.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "admin@example.com")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshResponse {
    pub access: String,
}

/// UpdateUserRequest
///
/// Partial update for a user, used by both `/profile` and the staff-only `/users/{id}`.
/// `is_active` / `is_staff` are ignored on `/profile`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// UserFilter
///
/// Exact-match query parameters for `GET /users`.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.id.is_none_or(|id| user.id == id)
            && self.username.as_ref().is_none_or(|u| &user.username == u)
            && self.email.as_ref().is_none_or(|e| user.email.as_ref() == Some(e))
            && self.phone.as_ref().is_none_or(|p| user.phone.as_ref() == Some(p))
    }
}

// --- Asset catalog ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    pub name: String,
}

/// SubCategory
///
/// The parent category is exposed as `category` (its id) in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct SubCategory {
    pub id: i64,
    #[serde(rename = "category")]
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateSubCategoryRequest {
    pub category: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSubCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct SubCategoryFilter {
    pub category: Option<i64>,
}

/// ImageUpload
///
/// Row of `images` joined with its category and subcategory names.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct ImageUpload {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "category")]
    pub category_id: i64,
    #[serde(rename = "subcategory")]
    pub subcategory_id: i64,
    // Object key of the uploaded file.
    pub image: String,
    #[ts(type = "string")]
    pub uploaded_at: DateTime<Utc>,
    pub category_name: String,
    pub subcategory_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateImageRequest {
    pub category: i64,
    pub subcategory: i64,
    /// Key returned by `POST /upload/presigned`.
    #[schema(example = "uploads/0b6f7c1e-2d1a-4a5e-9d0e-1f2a3b4c5d6e.jpg")]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateImageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewImage {
    pub user_id: Option<Uuid>,
    pub category_id: i64,
    pub subcategory_id: i64,
    pub image: String,
}

#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct ImageFilter {
    pub id: Option<i64>,
    pub category: Option<i64>,
    pub subcategory: Option<i64>,
    pub user: Option<Uuid>,
}

impl ImageFilter {
    pub fn matches(&self, image: &ImageUpload) -> bool {
        self.id.is_none_or(|id| image.id == id)
            && self.category.is_none_or(|c| image.category_id == c)
            && self.subcategory.is_none_or(|s| image.subcategory_id == s)
            && self.user.is_none_or(|u| image.user_id == Some(u))
    }
}

// --- Video catalog ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema, Default,
)]
#[sqlx(type_name = "video_category")]
#[ts(export)]
pub enum VideoCategory {
    #[default]
    Education,
    Entertainment,
    Music,
    Sports,
    Technology,
    Lifestyle,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct YoutubeVideo {
    pub id: i64,
    pub video_url: String,
    pub video_name: String,
    pub category: VideoCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateVideoRequest {
    #[schema(example = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    pub video_url: String,
    pub video_name: String,
    pub category: VideoCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateVideoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<VideoCategory>,
}

// --- Carousel ---

/// Carousel
///
/// Four optional image slots shown on the homepage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Carousel {
    pub id: i64,
    pub image1: Option<String>,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub image4: Option<String>,
}

impl Carousel {
    /// add_image
    ///
    /// Places `key` in the first empty slot. With all four taken, slot 1 is dropped,
    /// slots 2..4 move one to the left and `key` goes into slot 4. Returns the
    /// evicted key so its object can be removed from storage.
    pub fn add_image(&mut self, key: String) -> Option<String> {
        let mut slots = [
            &mut self.image1,
            &mut self.image2,
            &mut self.image3,
            &mut self.image4,
        ];

        if let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) {
            **slot = Some(key);
            return None;
        }

        let evicted = self.image1.take();
        self.image1 = self.image2.take();
        self.image2 = self.image3.take();
        self.image3 = self.image4.take();
        self.image4 = Some(key);
        evicted
    }

    /// Applies the slots present in `req`. A slot sent as `null` is cleared.
    pub fn apply(&mut self, req: UpdateCarouselRequest) {
        let changes = [
            (&mut self.image1, req.image1),
            (&mut self.image2, req.image2),
            (&mut self.image3, req.image3),
            (&mut self.image4, req.image4),
        ];
        for (slot, change) in changes {
            if let Some(value) = change {
                *slot = value;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarouselRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image4: Option<String>,
}

/// UpdateCarouselRequest
///
/// Body of PUT/PATCH on a carousel. An absent field leaves its slot alone, an explicit
/// `null` empties it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCarouselRequest {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub image1: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub image2: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub image3: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[schema(value_type = Option<String>)]
    pub image4: Option<Option<String>>,
}

// Serde only calls this for fields present in the input, `null` included.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddCarouselImageRequest {
    pub image: String,
}

// --- Subscriptions ---

/// Subscription
///
/// Row of `subscriptions` joined with the owner's display fields.
#[derive(Debug, Clone, FromRow, Default, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub user_id: Uuid,
    pub username: String,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    #[sqlx(flatten)]
    pub entitlement: Entitlement,
}

impl Subscription {
    /// Serializable view with `is_active` evaluated against `today`.
    pub fn to_response(&self, today: NaiveDate) -> SubscriptionResponse {
        SubscriptionResponse {
            id: self.id,
            user: self.username.clone(),
            user_id: self.user_id,
            user_email: self.user_email.clone(),
            user_phone: self.user_phone.clone(),
            plan: self.entitlement.plan,
            start_date: self.entitlement.start_date,
            end_date: self.entitlement.end_date,
            is_active: self.entitlement.is_active(today),
            revoked: self.entitlement.revoked,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub entitlement: Entitlement,
}

/// SubscriptionResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct SubscriptionResponse {
    pub id: i64,
    /// Owner's username.
    pub user: String,
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub plan: Option<Plan>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub revoked: bool,
}

/// CreateSubscriptionRequest
///
/// Either `plan` or `revoked: true` must be supplied. `revoke` is accepted as an alias.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    #[serde(default)]
    #[schema(example = "monthly")]
    pub plan: Option<String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, alias = "revoke")]
    pub revoked: Option<bool>,
}

impl CreateSubscriptionRequest {
    pub fn change(&self) -> EntitlementChange {
        EntitlementChange {
            plan: self.plan.clone(),
            start_date: self.start_date,
            revoked: self.revoked,
        }
    }
}

/// UpdateSubscriptionRequest
///
/// Partial update. `start_date` is fixed at grant time and `end_date` is derived, so
/// neither is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSubscriptionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, alias = "revoke", skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,
}

impl UpdateSubscriptionRequest {
    pub fn change(&self) -> EntitlementChange {
        EntitlementChange {
            plan: self.plan.clone(),
            start_date: None,
            revoked: self.revoked,
        }
    }
}

// --- Uploads ---

/// UploadPurpose
///
/// Decides the key prefix of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UploadPurpose {
    #[default]
    Image,
    Carousel,
    ProfileImage,
    Logo,
}

impl UploadPurpose {
    pub fn key_prefix(self, user_id: Uuid) -> String {
        match self {
            UploadPurpose::Image => "uploads".to_string(),
            UploadPurpose::Carousel => "carousel".to_string(),
            UploadPurpose::ProfileImage => format!("profile_images/{}", user_id),
            UploadPurpose::Logo => format!("user_logos/{}", user_id),
        }
    }
}

/// PresignedUrlRequest
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// Original filename, used to derive the extension.
    #[schema(example = "banner.jpg")]
    pub filename: String,
    /// MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
    #[serde(default)]
    pub purpose: UploadPurpose,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// Time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key to reference the file in later requests.
    pub resource_key: String,
}
