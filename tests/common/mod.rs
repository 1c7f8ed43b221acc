//! Test doubles shared by the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use advertising_backend::{
    entitlement::Entitlement,
    error::RepositoryError,
    identity::IdentifierKind,
    models::{
        Carousel, CarouselRequest, Category, CreateVideoRequest, ImageFilter, ImageUpload,
        NewImage, NewSubscription, NewUser, SubCategory, Subscription, UpdateImageRequest,
        UpdateSubCategoryRequest, UpdateUserRequest, UpdateVideoRequest, User, UserFilter,
        YoutubeVideo,
    },
    repository::{Repository, constraints},
};

#[derive(Debug, Clone)]
struct StoredImage {
    id: i64,
    user_id: Option<Uuid>,
    category_id: i64,
    subcategory_id: i64,
    image: String,
    uploaded_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredSubscription {
    id: i64,
    user_id: Uuid,
    entitlement: Entitlement,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<User>,
    categories: Vec<Category>,
    subcategories: Vec<SubCategory>,
    images: Vec<StoredImage>,
    videos: Vec<YoutubeVideo>,
    carousels: Vec<Carousel>,
    subscriptions: Vec<StoredSubscription>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_user_unique(&self, candidate: &User) -> Result<(), RepositoryError> {
        for other in self.users.iter().filter(|u| u.id != candidate.id) {
            if other.username == candidate.username {
                return Err(RepositoryError::Conflict(constraints::USERNAME_UNIQUE.into()));
            }
            if candidate.email.is_some() && other.email == candidate.email {
                return Err(RepositoryError::Conflict(constraints::EMAIL_UNIQUE.into()));
            }
            if candidate.phone.is_some() && other.phone == candidate.phone {
                return Err(RepositoryError::Conflict(constraints::PHONE_UNIQUE.into()));
            }
        }
        Ok(())
    }

    fn check_subcategory(&self, candidate: &SubCategory) -> Result<(), RepositoryError> {
        if !self.categories.iter().any(|c| c.id == candidate.category_id) {
            return Err(RepositoryError::Conflict(
                constraints::SUBCATEGORY_CATEGORY_FK.into(),
            ));
        }
        let duplicate = self.subcategories.iter().any(|s| {
            s.id != candidate.id && s.category_id == candidate.category_id && s.name == candidate.name
        });
        if duplicate {
            return Err(RepositoryError::Conflict(
                constraints::SUBCATEGORY_NAME_UNIQUE.into(),
            ));
        }
        Ok(())
    }

    fn check_image(&self, candidate: &StoredImage) -> Result<(), RepositoryError> {
        if !self.categories.iter().any(|c| c.id == candidate.category_id) {
            return Err(RepositoryError::Conflict(constraints::IMAGE_CATEGORY_FK.into()));
        }
        if !self.subcategories.iter().any(|s| s.id == candidate.subcategory_id) {
            return Err(RepositoryError::Conflict(
                constraints::IMAGE_SUBCATEGORY_FK.into(),
            ));
        }
        Ok(())
    }

    fn image_view(&self, stored: &StoredImage) -> Option<ImageUpload> {
        let category = self.categories.iter().find(|c| c.id == stored.category_id)?;
        let subcategory = self
            .subcategories
            .iter()
            .find(|s| s.id == stored.subcategory_id)?;
        Some(ImageUpload {
            id: stored.id,
            user_id: stored.user_id,
            category_id: stored.category_id,
            subcategory_id: stored.subcategory_id,
            image: stored.image.clone(),
            uploaded_at: stored.uploaded_at,
            category_name: category.name.clone(),
            subcategory_name: subcategory.name.clone(),
        })
    }

    fn subscription_view(&self, stored: &StoredSubscription) -> Option<Subscription> {
        let user = self.users.iter().find(|u| u.id == stored.user_id)?;
        Some(Subscription {
            id: stored.id,
            user_id: user.id,
            username: user.username.clone(),
            user_email: user.email.clone(),
            user_phone: user.phone.clone(),
            entitlement: stored.entitlement.clone(),
        })
    }

    // Cascades mirror the ON DELETE CASCADE foreign keys of the schema.
    fn cascade_subcategory(&mut self, subcategory_id: i64) {
        self.images.retain(|i| i.subcategory_id != subcategory_id);
    }

    fn cascade_category(&mut self, category_id: i64) {
        let removed: Vec<i64> = self
            .subcategories
            .iter()
            .filter(|s| s.category_id == category_id)
            .map(|s| s.id)
            .collect();
        self.subcategories.retain(|s| s.category_id != category_id);
        self.images.retain(|i| {
            i.category_id != category_id && !removed.contains(&i.subcategory_id)
        });
    }
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process memory. Emulates the unique constraints,
/// foreign keys and cascades of the Postgres schema. Used by the test suite.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- IDENTITY ---

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.state().users.iter().find(|u| u.id == id).cloned()
    }

    async fn find_user_by(&self, kind: IdentifierKind, value: &str) -> Option<User> {
        self.state()
            .users
            .iter()
            .find(|u| match kind {
                IdentifierKind::Email => u.email.as_deref() == Some(value),
                IdentifierKind::Phone => u.phone.as_deref() == Some(value),
                IdentifierKind::Username => u.username == value,
            })
            .cloned()
    }

    async fn list_users(&self, filter: &UserFilter) -> Vec<User> {
        self.state()
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state();
        let created = User {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            profile_image: user.profile_image,
            logo: user.logo,
            is_active: true,
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        state.check_user_unique(&created)?;
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state();
        let Some(current) = state.users.iter().find(|u| u.id == id).cloned() else {
            return Ok(None);
        };

        let updated = User {
            username: req.username.unwrap_or(current.username),
            email: req.email.or(current.email),
            phone: req.phone.or(current.phone),
            is_active: req.is_active.unwrap_or(current.is_active),
            is_staff: req.is_staff.unwrap_or(current.is_staff),
            profile_image: req.profile_image.or(current.profile_image),
            logo: req.logo.or(current.logo),
            ..current
        };
        state.check_user_unique(&updated)?;

        if let Some(slot) = state.users.iter_mut().find(|u| u.id == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return false;
        }
        state.subscriptions.retain(|s| s.user_id != id);
        state.images.retain(|i| i.user_id != Some(id));
        true
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> Vec<Category> {
        self.state().categories.clone()
    }

    async fn get_category(&self, id: i64) -> Option<Category> {
        self.state().categories.iter().find(|c| c.id == id).cloned()
    }

    async fn create_category(&self, name: String) -> Result<Category, RepositoryError> {
        let mut state = self.state();
        if state.categories.iter().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict(
                constraints::CATEGORY_NAME_UNIQUE.into(),
            ));
        }
        let category = Category {
            id: state.next_id(),
            name,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        name: String,
    ) -> Result<Option<Category>, RepositoryError> {
        let mut state = self.state();
        if state.categories.iter().any(|c| c.id != id && c.name == name) {
            return Err(RepositoryError::Conflict(
                constraints::CATEGORY_NAME_UNIQUE.into(),
            ));
        }
        Ok(state.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = name;
            c.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        if state.categories.len() == before {
            return false;
        }
        state.cascade_category(id);
        true
    }

    // --- SUBCATEGORIES ---

    async fn list_subcategories(&self, category_id: Option<i64>) -> Vec<SubCategory> {
        self.state()
            .subcategories
            .iter()
            .filter(|s| category_id.is_none_or(|c| s.category_id == c))
            .cloned()
            .collect()
    }

    async fn get_subcategory(&self, id: i64) -> Option<SubCategory> {
        self.state().subcategories.iter().find(|s| s.id == id).cloned()
    }

    async fn create_subcategory(
        &self,
        category_id: i64,
        name: String,
    ) -> Result<SubCategory, RepositoryError> {
        let mut state = self.state();
        let mut subcategory = SubCategory {
            id: 0,
            category_id,
            name,
        };
        state.check_subcategory(&subcategory)?;
        subcategory.id = state.next_id();
        state.subcategories.push(subcategory.clone());
        Ok(subcategory)
    }

    async fn update_subcategory(
        &self,
        id: i64,
        req: UpdateSubCategoryRequest,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        let mut state = self.state();
        let Some(current) = state.subcategories.iter().find(|s| s.id == id).cloned() else {
            return Ok(None);
        };
        let updated = SubCategory {
            id,
            category_id: req.category.unwrap_or(current.category_id),
            name: req.name.unwrap_or(current.name),
        };
        state.check_subcategory(&updated)?;
        if let Some(slot) = state.subcategories.iter_mut().find(|s| s.id == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_subcategory(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.subcategories.len();
        state.subcategories.retain(|s| s.id != id);
        if state.subcategories.len() == before {
            return false;
        }
        state.cascade_subcategory(id);
        true
    }

    // --- IMAGES ---

    async fn list_images(&self, filter: &ImageFilter) -> Vec<ImageUpload> {
        let state = self.state();
        let mut images: Vec<ImageUpload> = state
            .images
            .iter()
            .filter_map(|i| state.image_view(i))
            .filter(|i| filter.matches(i))
            .collect();
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        images
    }

    async fn get_image(&self, id: i64) -> Option<ImageUpload> {
        let state = self.state();
        state
            .images
            .iter()
            .find(|i| i.id == id)
            .and_then(|i| state.image_view(i))
    }

    async fn create_image(&self, image: NewImage) -> Result<ImageUpload, RepositoryError> {
        let mut state = self.state();
        let mut stored = StoredImage {
            id: 0,
            user_id: image.user_id,
            category_id: image.category_id,
            subcategory_id: image.subcategory_id,
            image: image.image,
            uploaded_at: Utc::now(),
        };
        state.check_image(&stored)?;
        stored.id = state.next_id();
        state.images.push(stored.clone());
        state
            .image_view(&stored)
            .ok_or_else(|| RepositoryError::Database("image vanished after insert".into()))
    }

    async fn update_image(
        &self,
        id: i64,
        req: UpdateImageRequest,
    ) -> Result<Option<ImageUpload>, RepositoryError> {
        let mut state = self.state();
        let Some(current) = state.images.iter().find(|i| i.id == id).cloned() else {
            return Ok(None);
        };
        let updated = StoredImage {
            category_id: req.category.unwrap_or(current.category_id),
            subcategory_id: req.subcategory.unwrap_or(current.subcategory_id),
            image: req.image.unwrap_or(current.image),
            ..current
        };
        state.check_image(&updated)?;
        if let Some(slot) = state.images.iter_mut().find(|i| i.id == id) {
            *slot = updated.clone();
        }
        Ok(state.image_view(&updated))
    }

    async fn delete_image(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.images.len();
        state.images.retain(|i| i.id != id);
        state.images.len() != before
    }

    // --- VIDEOS ---

    async fn list_videos(&self) -> Vec<YoutubeVideo> {
        self.state().videos.clone()
    }

    async fn get_video(&self, id: i64) -> Option<YoutubeVideo> {
        self.state().videos.iter().find(|v| v.id == id).cloned()
    }

    async fn create_video(&self, req: CreateVideoRequest) -> Result<YoutubeVideo, RepositoryError> {
        let mut state = self.state();
        let video = YoutubeVideo {
            id: state.next_id(),
            video_url: req.video_url,
            video_name: req.video_name,
            category: req.category,
        };
        state.videos.push(video.clone());
        Ok(video)
    }

    async fn update_video(
        &self,
        id: i64,
        req: UpdateVideoRequest,
    ) -> Result<Option<YoutubeVideo>, RepositoryError> {
        let mut state = self.state();
        Ok(state.videos.iter_mut().find(|v| v.id == id).map(|v| {
            if let Some(url) = req.video_url {
                v.video_url = url;
            }
            if let Some(name) = req.video_name {
                v.video_name = name;
            }
            if let Some(category) = req.category {
                v.category = category;
            }
            v.clone()
        }))
    }

    async fn delete_video(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.videos.len();
        state.videos.retain(|v| v.id != id);
        state.videos.len() != before
    }

    // --- CAROUSELS ---

    async fn list_carousels(&self) -> Vec<Carousel> {
        self.state().carousels.clone()
    }

    async fn get_carousel(&self, id: i64) -> Option<Carousel> {
        self.state().carousels.iter().find(|c| c.id == id).cloned()
    }

    async fn create_carousel(&self, req: CarouselRequest) -> Result<Carousel, RepositoryError> {
        let mut state = self.state();
        let carousel = Carousel {
            id: state.next_id(),
            image1: req.image1,
            image2: req.image2,
            image3: req.image3,
            image4: req.image4,
        };
        state.carousels.push(carousel.clone());
        Ok(carousel)
    }

    async fn save_carousel(&self, carousel: &Carousel) -> Result<Option<Carousel>, RepositoryError> {
        let mut state = self.state();
        Ok(state
            .carousels
            .iter_mut()
            .find(|c| c.id == carousel.id)
            .map(|slot| {
                *slot = carousel.clone();
                slot.clone()
            }))
    }

    async fn delete_carousel(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.carousels.len();
        state.carousels.retain(|c| c.id != id);
        state.carousels.len() != before
    }

    // --- SUBSCRIPTIONS ---

    async fn list_subscriptions(&self, user_id: Option<Uuid>) -> Vec<Subscription> {
        let state = self.state();
        state
            .subscriptions
            .iter()
            .filter(|s| user_id.is_none_or(|u| s.user_id == u))
            .filter_map(|s| state.subscription_view(s))
            .collect()
    }

    async fn get_subscription(&self, id: i64) -> Option<Subscription> {
        let state = self.state();
        state
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| state.subscription_view(s))
    }

    async fn get_subscription_for_user(&self, user_id: Uuid) -> Option<Subscription> {
        let state = self.state();
        state
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id)
            .and_then(|s| state.subscription_view(s))
    }

    async fn create_subscription(
        &self,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError> {
        let mut state = self.state();
        if !state.users.iter().any(|u| u.id == sub.user_id) {
            return Err(RepositoryError::Conflict(
                constraints::SUBSCRIPTION_USER_FK.into(),
            ));
        }
        if state.subscriptions.iter().any(|s| s.user_id == sub.user_id) {
            return Err(RepositoryError::Conflict(
                constraints::SUBSCRIPTION_USER_UNIQUE.into(),
            ));
        }
        let stored = StoredSubscription {
            id: state.next_id(),
            user_id: sub.user_id,
            entitlement: sub.entitlement,
        };
        state.subscriptions.push(stored.clone());
        state
            .subscription_view(&stored)
            .ok_or_else(|| RepositoryError::Database("subscription owner vanished".into()))
    }

    async fn save_subscription(
        &self,
        id: i64,
        entitlement: &Entitlement,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let mut state = self.state();
        let Some(stored) = state.subscriptions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        stored.entitlement = entitlement.clone();
        let stored = stored.clone();
        Ok(state.subscription_view(&stored))
    }

    async fn delete_subscription(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.id != id);
        state.subscriptions.len() != before
    }
}
