use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use super::Repository;
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

const USER_COLUMNS: &str =
    "id, username, email, phone, password_hash, profile_image, logo, is_active, is_staff, created_at";

const IMAGE_SELECT: &str = r#"
    SELECT i.id, i.user_id, i.category_id, i.subcategory_id, i.image, i.uploaded_at,
           c.name AS category_name, s.name AS subcategory_name
    FROM images i
    JOIN categories c ON c.id = i.category_id
    JOIN subcategories s ON s.id = i.subcategory_id
"#;

const SUBSCRIPTION_SELECT: &str = r#"
    SELECT s.id, s.user_id, u.username, u.email AS user_email, u.phone AS user_phone,
           s.plan, s.start_date, s.end_date, s.revoked
    FROM subscriptions s
    JOIN users u ON u.id = s.user_id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are bound at runtime; the schema lives
/// in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn execute_delete(&self, sql: &str, id: i64, what: &str) -> bool {
        match sqlx::query(sql).bind(id).execute(&self.pool).await {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete {} error: {:?}", what, e);
                false
            }
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- IDENTITY ---

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// find_user_by
    ///
    /// The column name comes from `IdentifierKind`, never from the caller's input.
    async fn find_user_by(&self, kind: IdentifierKind, value: &str) -> Option<User> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS,
            kind.column()
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_user_by({:?}) error: {:?}", kind, e);
                None
            })
    }

    async fn list_users(&self, filter: &UserFilter) -> Vec<User> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));

        if let Some(id) = filter.id {
            builder.push(" AND id = ");
            builder.push_bind(id);
        }
        if let Some(username) = &filter.username {
            builder.push(" AND username = ");
            builder.push_bind(username.clone());
        }
        if let Some(email) = &filter.email {
            builder.push(" AND email = ");
            builder.push_bind(email.clone());
        }
        if let Some(phone) = &filter.phone {
            builder.push(" AND phone = ");
            builder.push_bind(phone.clone());
        }
        builder.push(" ORDER BY created_at ASC");

        match builder.build_query_as::<User>().fetch_all(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            r#"INSERT INTO users (id, username, email, phone, password_hash, profile_image, logo, is_staff)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {}"#,
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.email)
            .bind(user.phone)
            .bind(user.password_hash)
            .bind(user.profile_image)
            .bind(user.logo)
            .bind(user.is_staff)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// update_user
    ///
    /// COALESCE keeps columns whose field in `req` is `None`.
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            r#"UPDATE users
               SET username = COALESCE($2, username),
                   email = COALESCE($3, email),
                   phone = COALESCE($4, phone),
                   is_active = COALESCE($5, is_active),
                   is_staff = COALESCE($6, is_staff),
                   profile_image = COALESCE($7, profile_image),
                   logo = COALESCE($8, logo)
               WHERE id = $1
               RETURNING {}"#,
            USER_COLUMNS
        );
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(req.username)
            .bind(req.email)
            .bind(req.phone)
            .bind(req.is_active)
            .bind(req.is_staff)
            .bind(req.profile_image)
            .bind(req.logo)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete user error: {:?}", e);
                false
            }
        }
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> Vec<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_categories error: {:?}", e);
                vec![]
            })
    }

    async fn get_category(&self, id: i64) -> Option<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_category error: {:?}", e);
                None
            })
    }

    async fn create_category(&self, name: String) -> Result<Category, RepositoryError> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i64,
        name: String,
    ) -> Result<Option<Category>, RepositoryError> {
        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_category(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM categories WHERE id = $1", id, "category")
            .await
    }

    // --- SUBCATEGORIES ---

    async fn list_subcategories(&self, category_id: Option<i64>) -> Vec<SubCategory> {
        sqlx::query_as::<_, SubCategory>(
            r#"SELECT id, category_id, name FROM subcategories
               WHERE ($1::BIGINT IS NULL OR category_id = $1)
               ORDER BY id"#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_subcategories error: {:?}", e);
            vec![]
        })
    }

    async fn get_subcategory(&self, id: i64) -> Option<SubCategory> {
        sqlx::query_as::<_, SubCategory>(
            "SELECT id, category_id, name FROM subcategories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_subcategory error: {:?}", e);
            None
        })
    }

    async fn create_subcategory(
        &self,
        category_id: i64,
        name: String,
    ) -> Result<SubCategory, RepositoryError> {
        let created = sqlx::query_as::<_, SubCategory>(
            "INSERT INTO subcategories (category_id, name) VALUES ($1, $2) RETURNING id, category_id, name",
        )
        .bind(category_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_subcategory(
        &self,
        id: i64,
        req: UpdateSubCategoryRequest,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        let updated = sqlx::query_as::<_, SubCategory>(
            r#"UPDATE subcategories
               SET category_id = COALESCE($2, category_id),
                   name = COALESCE($3, name)
               WHERE id = $1
               RETURNING id, category_id, name"#,
        )
        .bind(id)
        .bind(req.category)
        .bind(req.name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_subcategory(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM subcategories WHERE id = $1", id, "subcategory")
            .await
    }

    // --- IMAGES ---

    async fn list_images(&self, filter: &ImageFilter) -> Vec<ImageUpload> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(IMAGE_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(id) = filter.id {
            builder.push(" AND i.id = ");
            builder.push_bind(id);
        }
        if let Some(category) = filter.category {
            builder.push(" AND i.category_id = ");
            builder.push_bind(category);
        }
        if let Some(subcategory) = filter.subcategory {
            builder.push(" AND i.subcategory_id = ");
            builder.push_bind(subcategory);
        }
        if let Some(user) = filter.user {
            builder.push(" AND i.user_id = ");
            builder.push_bind(user);
        }
        builder.push(" ORDER BY i.uploaded_at DESC, i.id DESC");

        match builder.build_query_as::<ImageUpload>().fetch_all(&self.pool).await {
            Ok(images) => images,
            Err(e) => {
                tracing::error!("list_images error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_image(&self, id: i64) -> Option<ImageUpload> {
        let sql = format!("{} WHERE i.id = $1", IMAGE_SELECT);
        sqlx::query_as::<_, ImageUpload>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_image error: {:?}", e);
                None
            })
    }

    /// create_image
    ///
    /// Inserts and joins the category/subcategory names in one statement.
    async fn create_image(&self, image: NewImage) -> Result<ImageUpload, RepositoryError> {
        let created = sqlx::query_as::<_, ImageUpload>(
            r#"
            WITH inserted AS (
                INSERT INTO images (user_id, category_id, subcategory_id, image)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, category_id, subcategory_id, image, uploaded_at
            )
            SELECT i.id, i.user_id, i.category_id, i.subcategory_id, i.image, i.uploaded_at,
                   c.name AS category_name, s.name AS subcategory_name
            FROM inserted i
            JOIN categories c ON c.id = i.category_id
            JOIN subcategories s ON s.id = i.subcategory_id
            "#,
        )
        .bind(image.user_id)
        .bind(image.category_id)
        .bind(image.subcategory_id)
        .bind(image.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_image(
        &self,
        id: i64,
        req: UpdateImageRequest,
    ) -> Result<Option<ImageUpload>, RepositoryError> {
        let updated = sqlx::query_as::<_, ImageUpload>(
            r#"
            WITH updated AS (
                UPDATE images
                SET category_id = COALESCE($2, category_id),
                    subcategory_id = COALESCE($3, subcategory_id),
                    image = COALESCE($4, image)
                WHERE id = $1
                RETURNING id, user_id, category_id, subcategory_id, image, uploaded_at
            )
            SELECT i.id, i.user_id, i.category_id, i.subcategory_id, i.image, i.uploaded_at,
                   c.name AS category_name, s.name AS subcategory_name
            FROM updated i
            JOIN categories c ON c.id = i.category_id
            JOIN subcategories s ON s.id = i.subcategory_id
            "#,
        )
        .bind(id)
        .bind(req.category)
        .bind(req.subcategory)
        .bind(req.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_image(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM images WHERE id = $1", id, "image")
            .await
    }

    // --- VIDEOS ---

    async fn list_videos(&self) -> Vec<YoutubeVideo> {
        sqlx::query_as::<_, YoutubeVideo>(
            "SELECT id, video_url, video_name, category FROM videos ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_videos error: {:?}", e);
            vec![]
        })
    }

    async fn get_video(&self, id: i64) -> Option<YoutubeVideo> {
        sqlx::query_as::<_, YoutubeVideo>(
            "SELECT id, video_url, video_name, category FROM videos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_video error: {:?}", e);
            None
        })
    }

    async fn create_video(&self, req: CreateVideoRequest) -> Result<YoutubeVideo, RepositoryError> {
        let created = sqlx::query_as::<_, YoutubeVideo>(
            r#"INSERT INTO videos (video_url, video_name, category) VALUES ($1, $2, $3)
               RETURNING id, video_url, video_name, category"#,
        )
        .bind(req.video_url)
        .bind(req.video_name)
        .bind(req.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_video(
        &self,
        id: i64,
        req: UpdateVideoRequest,
    ) -> Result<Option<YoutubeVideo>, RepositoryError> {
        let updated = sqlx::query_as::<_, YoutubeVideo>(
            r#"UPDATE videos
               SET video_url = COALESCE($2, video_url),
                   video_name = COALESCE($3, video_name),
                   category = COALESCE($4, category)
               WHERE id = $1
               RETURNING id, video_url, video_name, category"#,
        )
        .bind(id)
        .bind(req.video_url)
        .bind(req.video_name)
        .bind(req.category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_video(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM videos WHERE id = $1", id, "video")
            .await
    }

    // --- CAROUSELS ---

    async fn list_carousels(&self) -> Vec<Carousel> {
        sqlx::query_as::<_, Carousel>(
            "SELECT id, image1, image2, image3, image4 FROM carousels ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_carousels error: {:?}", e);
            vec![]
        })
    }

    async fn get_carousel(&self, id: i64) -> Option<Carousel> {
        sqlx::query_as::<_, Carousel>(
            "SELECT id, image1, image2, image3, image4 FROM carousels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_carousel error: {:?}", e);
            None
        })
    }

    async fn create_carousel(&self, req: CarouselRequest) -> Result<Carousel, RepositoryError> {
        let created = sqlx::query_as::<_, Carousel>(
            r#"INSERT INTO carousels (image1, image2, image3, image4) VALUES ($1, $2, $3, $4)
               RETURNING id, image1, image2, image3, image4"#,
        )
        .bind(req.image1)
        .bind(req.image2)
        .bind(req.image3)
        .bind(req.image4)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn save_carousel(&self, carousel: &Carousel) -> Result<Option<Carousel>, RepositoryError> {
        let saved = sqlx::query_as::<_, Carousel>(
            r#"UPDATE carousels SET image1 = $2, image2 = $3, image3 = $4, image4 = $5
               WHERE id = $1
               RETURNING id, image1, image2, image3, image4"#,
        )
        .bind(carousel.id)
        .bind(carousel.image1.as_deref())
        .bind(carousel.image2.as_deref())
        .bind(carousel.image3.as_deref())
        .bind(carousel.image4.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete_carousel(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM carousels WHERE id = $1", id, "carousel")
            .await
    }

    // --- SUBSCRIPTIONS ---

    async fn list_subscriptions(&self, user_id: Option<Uuid>) -> Vec<Subscription> {
        let sql = format!(
            "{} WHERE ($1::UUID IS NULL OR s.user_id = $1) ORDER BY s.id",
            SUBSCRIPTION_SELECT
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_subscriptions error: {:?}", e);
                vec![]
            })
    }

    async fn get_subscription(&self, id: i64) -> Option<Subscription> {
        let sql = format!("{} WHERE s.id = $1", SUBSCRIPTION_SELECT);
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_subscription error: {:?}", e);
                None
            })
    }

    async fn get_subscription_for_user(&self, user_id: Uuid) -> Option<Subscription> {
        let sql = format!("{} WHERE s.user_id = $1", SUBSCRIPTION_SELECT);
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_subscription_for_user error: {:?}", e);
                None
            })
    }

    /// create_subscription
    ///
    /// The unique index on `user_id` enforces one subscription per user.
    async fn create_subscription(
        &self,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError> {
        let created = sqlx::query_as::<_, Subscription>(
            r#"
            WITH inserted AS (
                INSERT INTO subscriptions (user_id, plan, start_date, end_date, revoked)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, plan, start_date, end_date, revoked
            )
            SELECT s.id, s.user_id, u.username, u.email AS user_email, u.phone AS user_phone,
                   s.plan, s.start_date, s.end_date, s.revoked
            FROM inserted s
            JOIN users u ON u.id = s.user_id
            "#,
        )
        .bind(sub.user_id)
        .bind(sub.entitlement.plan)
        .bind(sub.entitlement.start_date)
        .bind(sub.entitlement.end_date)
        .bind(sub.entitlement.revoked)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn save_subscription(
        &self,
        id: i64,
        entitlement: &Entitlement,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let saved = sqlx::query_as::<_, Subscription>(
            r#"
            WITH updated AS (
                UPDATE subscriptions
                SET plan = $2, start_date = $3, end_date = $4, revoked = $5
                WHERE id = $1
                RETURNING id, user_id, plan, start_date, end_date, revoked
            )
            SELECT s.id, s.user_id, u.username, u.email AS user_email, u.phone AS user_phone,
                   s.plan, s.start_date, s.end_date, s.revoked
            FROM updated s
            JOIN users u ON u.id = s.user_id
            "#,
        )
        .bind(id)
        .bind(entitlement.plan)
        .bind(entitlement.start_date)
        .bind(entitlement.end_date)
        .bind(entitlement.revoked)
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete_subscription(&self, id: i64) -> bool {
        self.execute_delete("DELETE FROM subscriptions WHERE id = $1", id, "subscription")
            .await
    }
}
