//! User repository for database operations

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::user::{Preferences, Theme, User, UserStats};
use crate::caption::Vibe;
use crate::domain::post::Category;
use crate::error::{Error, Result};

/// Repository for user database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new user to the database
    pub async fn save(&self, user: &User) -> Result<()> {
        let favorite_styles = serde_json::to_string(&user.preferences.favorite_styles)?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, profile_picture, profile_picture_file_id,
                theme, favorite_styles, default_category,
                total_posts, total_likes, joined_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.profile_picture)
        .bind(&user.profile_picture_file_id)
        .bind(user.preferences.theme.as_str())
        .bind(&favorite_styles)
        .bind(user.preferences.default_category.as_str())
        .bind(user.stats.total_posts)
        .bind(user.stats.total_likes)
        .bind(user.stats.joined_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(())
    }

    /// Update profile fields and preferences (stats are owned by the counters below)
    pub async fn update(&self, user: &User) -> Result<()> {
        let favorite_styles = serde_json::to_string(&user.preferences.favorite_styles)?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = ?,
                profile_picture = ?,
                profile_picture_file_id = ?,
                theme = ?,
                favorite_styles = ?,
                default_category = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.profile_picture)
        .bind(&user.profile_picture_file_id)
        .bind(user.preferences.theme.as_str())
        .bind(&favorite_styles)
        .bind(user.preferences.default_category.as_str())
        .bind(user.updated_at)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user.id.to_string()));
        }
        Ok(())
    }

    /// Get a user by ID
    pub async fn get(&self, user_id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{} WHERE username = ?", SELECT_USER))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::DatabaseError)?;

        row.map(UserRow::into_user).transpose()
    }

    /// Check whether a username is taken
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;
        Ok(row.0 > 0)
    }

    /// Add `delta` to the post counter, never going below zero
    pub async fn adjust_post_count(&self, user_id: Uuid, delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE users SET total_posts = MAX(total_posts + ?, 0), updated_at = ? WHERE id = ?",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;
        Ok(())
    }

    /// Reset the post counter to zero
    pub async fn reset_post_count(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET total_posts = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;
        Ok(())
    }

    /// Delete a user (posts cascade)
    pub async fn delete(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;
        Ok(result.rows_affected() > 0)
    }
}

const SELECT_USER: &str = r#"
    SELECT id, username, profile_picture, profile_picture_file_id,
           theme, favorite_styles, default_category,
           total_posts, total_likes, joined_at, created_at, updated_at
    FROM users
"#;

/// Database row for a user
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    profile_picture: Option<String>,
    profile_picture_file_id: Option<String>,
    theme: String,
    favorite_styles: String,
    default_category: String,
    total_posts: i64,
    total_likes: i64,
    joined_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid user ID: {}", e)))?;
        let theme = Theme::parse(&self.theme)
            .ok_or_else(|| Error::Parse(format!("Invalid theme: {}", self.theme)))?;
        let default_category = Category::parse(&self.default_category).ok_or_else(|| {
            Error::Parse(format!("Invalid category: {}", self.default_category))
        })?;
        let favorite_styles: Vec<Vibe> = serde_json::from_str(&self.favorite_styles)
            .map_err(|e| Error::Parse(format!("Invalid favorite styles JSON: {}", e)))?;

        Ok(User {
            id,
            username: self.username,
            profile_picture: self.profile_picture,
            profile_picture_file_id: self.profile_picture_file_id,
            preferences: Preferences {
                theme,
                favorite_styles,
                default_category,
            },
            stats: UserStats {
                total_posts: self.total_posts,
                total_likes: self.total_likes,
                joined_at: self.joined_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
