use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    entitlement::Entitlement,
    error::RepositoryError,
    identity::IdentifierKind,
    models::{
        Carousel, CarouselRequest, Category, CreateVideoRequest, ImageFilter, ImageUpload,
        NewImage, NewSubscription, NewUser, SubCategory, Subscription, UpdateImageRequest,
        UpdateSubCategoryRequest, UpdateUserRequest, UpdateVideoRequest, User, UserFilter,
        YoutubeVideo,
    },
};

mod postgres;

pub use postgres::PostgresRepository;

// Constraint names from the schema, used to turn
// conflicts into field errors.
pub mod constraints {
    pub const USERNAME_UNIQUE: &str = "users_username_key";
    pub const EMAIL_UNIQUE: &str = "users_email_key";
    pub const PHONE_UNIQUE: &str = "users_phone_key";
    pub const CATEGORY_NAME_UNIQUE: &str = "categories_name_key";
    pub const SUBCATEGORY_NAME_UNIQUE: &str = "subcategories_category_id_name_key";
    pub const SUBCATEGORY_CATEGORY_FK: &str = "subcategories_category_id_fkey";
    pub const IMAGE_CATEGORY_FK: &str = "images_category_id_fkey";
    pub const IMAGE_SUBCATEGORY_FK: &str = "images_subcategory_id_fkey";
    pub const SUBSCRIPTION_USER_UNIQUE: &str = "subscriptions_user_id_key";
    pub const SUBSCRIPTION_USER_FK: &str = "subscriptions_user_id_fkey";
}

/// Repository
///
/// Persistence contract used by every handler. Reads degrade to `None` / empty
/// collections on database failure (after logging); writes report
/// `RepositoryError` so constraint conflicts can be shown to the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity store ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    /// Lookup on the unique key selected by `kind`.
    async fn find_user_by(&self, kind: IdentifierKind, value: &str) -> Option<User>;
    async fn list_users(&self, filter: &UserFilter) -> Vec<User>;
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, RepositoryError>;
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Categories ---
    async fn list_categories(&self) -> Vec<Category>;
    async fn get_category(&self, id: i64) -> Option<Category>;
    async fn create_category(&self, name: String) -> Result<Category, RepositoryError>;
    async fn update_category(
        &self,
        id: i64,
        name: String,
    ) -> Result<Option<Category>, RepositoryError>;
    async fn delete_category(&self, id: i64) -> bool;

    // --- Subcategories ---
    async fn list_subcategories(&self, category_id: Option<i64>) -> Vec<SubCategory>;
    async fn get_subcategory(&self, id: i64) -> Option<SubCategory>;
    async fn create_subcategory(
        &self,
        category_id: i64,
        name: String,
    ) -> Result<SubCategory, RepositoryError>;
    async fn update_subcategory(
        &self,
        id: i64,
        req: UpdateSubCategoryRequest,
    ) -> Result<Option<SubCategory>, RepositoryError>;
    async fn delete_subcategory(&self, id: i64) -> bool;

    // --- Images ---
    async fn list_images(&self, filter: &ImageFilter) -> Vec<ImageUpload>;
    async fn get_image(&self, id: i64) -> Option<ImageUpload>;
    async fn create_image(&self, image: NewImage) -> Result<ImageUpload, RepositoryError>;
    async fn update_image(
        &self,
        id: i64,
        req: UpdateImageRequest,
    ) -> Result<Option<ImageUpload>, RepositoryError>;
    async fn delete_image(&self, id: i64) -> bool;

    // --- Videos ---
    async fn list_videos(&self) -> Vec<YoutubeVideo>;
    async fn get_video(&self, id: i64) -> Option<YoutubeVideo>;
    async fn create_video(&self, req: CreateVideoRequest) -> Result<YoutubeVideo, RepositoryError>;
    async fn update_video(
        &self,
        id: i64,
        req: UpdateVideoRequest,
    ) -> Result<Option<YoutubeVideo>, RepositoryError>;
    async fn delete_video(&self, id: i64) -> bool;

    // --- Carousels ---
    async fn list_carousels(&self) -> Vec<Carousel>;
    async fn get_carousel(&self, id: i64) -> Option<Carousel>;
    async fn create_carousel(&self, req: CarouselRequest) -> Result<Carousel, RepositoryError>;
    /// Persists all four slots of `carousel` as given.
    async fn save_carousel(&self, carousel: &Carousel) -> Result<Option<Carousel>, RepositoryError>;
    async fn delete_carousel(&self, id: i64) -> bool;

    // --- Subscriptions ---
    /// All subscriptions, or only the one owned by `user_id`.
    async fn list_subscriptions(&self, user_id: Option<Uuid>) -> Vec<Subscription>;
    async fn get_subscription(&self, id: i64) -> Option<Subscription>;
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Option<Subscription>;
    async fn create_subscription(
        &self,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError>;
    /// Overwrites the lifecycle fields of subscription `id`. Last writer wins.
    async fn save_subscription(
        &self,
        id: i64,
        entitlement: &Entitlement,
    ) -> Result<Option<Subscription>, RepositoryError>;
    async fn delete_subscription(&self, id: i64) -> bool;
}

/// RepositoryState
pub type RepositoryState = Arc<dyn Repository>;
