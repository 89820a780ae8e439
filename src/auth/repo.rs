use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_active, created_at";

impl User {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Matches either the username or the (case-folded) email.
    pub async fn find_by_login(db: &SqlitePool, login: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ? LIMIT 1"
        ))
        .bind(login)
        .bind(login.to_lowercase())
        .fetch_optional(db)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    pub async fn exists_with(db: &SqlitePool, username: &str, email: &str) -> anyhow::Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE username = ? OR email = ? LIMIT 1")
                .bind(username)
                .bind(email)
                .fetch_optional(db)
                .await
                .context("check user uniqueness")?;
        Ok(found.is_some())
    }

    /// Create a new user with the default role.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role, is_active, created_at) \
             VALUES (?, ?, ?, 'user', 1, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }
}
