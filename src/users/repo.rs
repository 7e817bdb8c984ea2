use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    media::MediaKind,
    profiles::{
        dto::{ChannelProfile, WatchHistoryRow, WatchedVideo},
        pipeline::{self, Projection},
    },
    users::repo_types::{NewUser, User},
};

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar, cover_image, \
                            refresh_token, watch_history, created_at, updated_at";

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending field.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    Some(c) if c.contains("username") => "username",
                    _ => "username or email",
                };
                return Self::Duplicate(field);
            }
        }
        Self::Backend(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for user records and the read models built over them.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Match on either identifier. A `None` identifier never matches.
    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;

    async fn create(&self, new: NewUser) -> StoreResult<User>;

    /// Unconditionally overwrite (or clear) the stored refresh token.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool>;

    /// Replace the stored refresh token only if it still equals `expected`.
    /// Returns `false` when another rotation or a logout got there first.
    async fn swap_refresh_token(&self, id: Uuid, expected: &str, next: &str)
        -> StoreResult<bool>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>>;

    async fn update_media(&self, id: Uuid, kind: MediaKind, url: &str)
        -> StoreResult<Option<User>>;

    async fn channel_profile(
        &self,
        username: &str,
        viewer: Uuid,
    ) -> StoreResult<Option<ChannelProfile>>;

    /// Videos in watch order with their owners resolved. Empty for unknown ids.
    async fn watch_history(&self, id: Uuid) -> StoreResult<Vec<WatchedVideo>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM users
            WHERE ($1::text IS NOT NULL AND username = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            LIMIT 1
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, avatar, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.full_name)
            .bind(&new.password_hash)
            .bind(&new.avatar)
            .bind(&new.cover_image)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET refresh_token = $3, updated_at = now()
             WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET full_name = $2, email = $3, updated_at = now()
             WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(full_name)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update_media(
        &self,
        id: Uuid,
        kind: MediaKind,
        url: &str,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET {} = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            kind.column(),
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(url)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn channel_profile(
        &self,
        username: &str,
        viewer: Uuid,
    ) -> StoreResult<Option<ChannelProfile>> {
        let stages = pipeline::channel_profile_stages(username);
        debug!(stages = ?stages.stage_names(), "channel profile pipeline");
        let mut query = stages.project(Projection::ChannelProfile { viewer });
        let profile = query
            .build_query_as::<ChannelProfile>()
            .fetch_optional(&self.db)
            .await?;
        Ok(profile)
    }

    async fn watch_history(&self, id: Uuid) -> StoreResult<Vec<WatchedVideo>> {
        let stages = pipeline::watch_history_stages(id);
        debug!(stages = ?stages.stage_names(), "watch history pipeline");
        let mut query = stages.project(Projection::WatchHistory);
        let rows = query
            .build_query_as::<WatchHistoryRow>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(WatchedVideo::from).collect())
    }
}
