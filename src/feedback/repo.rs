use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub question_id: String,
    pub user_id: i64,
    pub rating: Option<i64>,
    pub feedback_text: Option<String>,
    pub is_helpful: Option<bool>,
    pub admin_response: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub responded_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub question_id: String,
    pub rating: Option<i64>,
    pub feedback_text: Option<String>,
    pub is_helpful: Option<bool>,
}

const FEEDBACK_COLUMNS: &str = "id, question_id, user_id, rating, feedback_text, is_helpful, \
                                admin_response, responded_at, created_at";

pub async fn insert(db: &SqlitePool, user_id: i64, fb: &NewFeedback) -> anyhow::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO question_feedback (question_id, user_id, rating, feedback_text, is_helpful, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fb.question_id)
    .bind(user_id)
    .bind(fb.rating)
    .bind(fb.feedback_text.as_deref())
    .bind(fb.is_helpful)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await
    .context("insert feedback")?;
    Ok(result.last_insert_rowid())
}

/// Newest first.
pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<Feedback>> {
    let rows = sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM question_feedback WHERE user_id = ? ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list feedback by user")?;
    Ok(rows)
}

/// Attaches or replaces the admin response. Returns rows touched.
pub async fn set_response(db: &SqlitePool, feedback_id: i64, response: &str) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE question_feedback SET admin_response = ?, responded_at = ? WHERE id = ?",
    )
    .bind(response)
    .bind(OffsetDateTime::now_utc())
    .bind(feedback_id)
    .execute(db)
    .await
    .context("respond to feedback")?;
    Ok(result.rows_affected())
}
