/// Local store for users, recent searches, and ratings
///
/// Destructive operations and rating inserts require the acting user to hold
/// the moderator role; refusals surface as `AppError::Forbidden` rather than
/// a bare boolean.
use sqlx::{Row, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::{Role, StoredRating, StoredSearch, StoredUser},
};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add_user(&self, user_id: i64, role: Role) -> AppResult<()> {
        sqlx::query("INSERT INTO users (id, role) VALUES (?, ?)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id, role = role.as_str(), "User registered");
        Ok(())
    }

    pub async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn user_role(&self, user_id: i64) -> AppResult<Option<Role>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role.as_deref().map(Role::parse))
    }

    /// Typed moderator check used by every privileged operation
    async fn authorize_moderator(&self, user_id: i64) -> AppResult<()> {
        match self.user_role(user_id).await? {
            Some(Role::Moderator) => Ok(()),
            _ => {
                tracing::warn!(user_id, "Privileged store operation refused");
                Err(AppError::Forbidden(format!(
                    "user {} is not a moderator",
                    user_id
                )))
            }
        }
    }

    /// Records a completed four-slot search; returns the new search id
    pub async fn add_search(
        &self,
        user_id: i64,
        genre: &str,
        release_year: i64,
        duration: i64,
        cast: &str,
    ) -> AppResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO recent_searches (user_id, genre, release_year, duration, "cast")
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(genre)
        .bind(release_year)
        .bind(duration)
        .bind(cast)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts a rating; moderator only
    pub async fn add_rating(&self, user_id: i64, movie_id: i64, rating: f64) -> AppResult<i64> {
        self.authorize_moderator(user_id).await?;

        let result =
            sqlx::query("INSERT INTO ratings (user_id, movie_id, rating) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(movie_id)
                .bind(rating)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Deletes a user and, via cascade, their recorded searches; the acting
    /// user must be a moderator
    pub async fn delete_user(&self, acting_user: i64, target_user: i64) -> AppResult<bool> {
        self.authorize_moderator(acting_user).await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(target_user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes one of the acting moderator's own searches
    pub async fn delete_search(&self, user_id: i64, search_id: i64) -> AppResult<bool> {
        self.authorize_moderator(user_id).await?;

        let result = sqlx::query("DELETE FROM recent_searches WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(search_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes one of the acting moderator's own ratings
    pub async fn delete_rating(&self, user_id: i64, rating_id: i64) -> AppResult<bool> {
        self.authorize_moderator(user_id).await?;

        let result = sqlx::query("DELETE FROM ratings WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(rating_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_users(&self) -> AppResult<Vec<StoredUser>> {
        let rows = sqlx::query("SELECT id, role FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let role: String = row.try_get("role")?;
                Ok(StoredUser {
                    id: row.try_get("id")?,
                    role: Role::parse(&role),
                })
            })
            .collect()
    }

    pub async fn list_searches(&self) -> AppResult<Vec<StoredSearch>> {
        let searches = sqlx::query_as::<_, StoredSearch>(
            r#"SELECT id, user_id, genre, release_year, duration, "cast", search_date
               FROM recent_searches ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(searches)
    }

    pub async fn list_user_searches(&self, user_id: i64) -> AppResult<Vec<StoredSearch>> {
        let searches = sqlx::query_as::<_, StoredSearch>(
            r#"SELECT id, user_id, genre, release_year, duration, "cast", search_date
               FROM recent_searches WHERE user_id = ? ORDER BY id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(searches)
    }

    pub async fn list_ratings(&self) -> AppResult<Vec<StoredRating>> {
        let ratings = sqlx::query_as::<_, StoredRating>(
            "SELECT id, user_id, movie_id, rating FROM ratings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }
}
