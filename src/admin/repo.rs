use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::auth::repo_types::Role;

/// A user as the admin panel sees it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub card_count: i64,
    pub question_count: i64,
}

pub async fn list_users(db: &SqlitePool) -> anyhow::Result<Vec<UserSummary>> {
    let rows = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username, u.email, u.role, u.is_active, u.created_at,
               (SELECT COUNT(*) FROM cards c WHERE c.user_id = u.id)               AS card_count,
               (SELECT COUNT(*) FROM generated_questions g WHERE g.user_id = u.id) AS question_count
          FROM users u
         ORDER BY u.id DESC
        "#,
    )
    .fetch_all(db)
    .await
    .context("list users for admin")?;
    Ok(rows)
}

pub async fn count(db: &SqlitePool, sql: &str) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(sql)
        .fetch_one(db)
        .await
        .with_context(|| format!("count query `{sql}`"))?;
    Ok(n)
}

pub async fn set_active(db: &SqlitePool, user_id: i64, active: bool) -> anyhow::Result<u64> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(user_id)
        .execute(db)
        .await
        .context("set user active flag")?;
    Ok(result.rows_affected())
}

/// One-way: there is no statement that moves a user back to `user`.
pub async fn promote_to_admin(db: &SqlitePool, user_id: i64) -> anyhow::Result<u64> {
    let result = sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(user_id)
        .execute(db)
        .await
        .context("promote user")?;
    Ok(result.rows_affected())
}
