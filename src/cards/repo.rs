use anyhow::Context;
use serde::Serialize;
use sqlx::{types::Json, FromRow, SqlitePool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Card {
    pub id: i64,
    pub user_id: i64,
    pub question: String,
    pub answer: String,
    pub difficulty: Option<String>,
    pub tags: Option<Json<Vec<String>>>,
    pub reference: Option<String>,
    pub hint: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated card content.
#[derive(Debug, Clone, PartialEq)]
pub struct CardContent {
    pub question: String,
    pub answer: String,
    pub difficulty: Option<String>,
    pub tags: Option<Vec<String>>,
    pub reference: Option<String>,
    pub hint: Option<String>,
}

const CARD_COLUMNS: &str =
    "id, user_id, question, answer, difficulty, tags, reference, hint, created_at, updated_at";

/// Newest first.
pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<Card>> {
    let rows = sqlx::query_as::<_, Card>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ? ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list cards by user")?;
    Ok(rows)
}

pub async fn get_for_user(db: &SqlitePool, user_id: i64, card_id: i64) -> anyhow::Result<Option<Card>> {
    let row = sqlx::query_as::<_, Card>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE id = ? AND user_id = ?"
    ))
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get card")?;
    Ok(row)
}

pub async fn insert(db: &SqlitePool, user_id: i64, card: &CardContent) -> anyhow::Result<i64> {
    let now = OffsetDateTime::now_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO cards (user_id, question, answer, difficulty, tags, reference, hint, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&card.question)
    .bind(&card.answer)
    .bind(card.difficulty.as_deref())
    .bind(card.tags.as_ref().map(Json))
    .bind(card.reference.as_deref())
    .bind(card.hint.as_deref())
    .bind(now)
    .bind(now)
    .execute(db)
    .await
    .context("insert card")?;
    Ok(result.last_insert_rowid())
}

/// Returns the number of rows touched; zero means missing or not owned.
pub async fn update_for_user(
    db: &SqlitePool,
    user_id: i64,
    card_id: i64,
    card: &CardContent,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE cards
           SET question = ?, answer = ?, difficulty = ?, tags = ?, reference = ?, hint = ?, updated_at = ?
         WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&card.question)
    .bind(&card.answer)
    .bind(card.difficulty.as_deref())
    .bind(card.tags.as_ref().map(Json))
    .bind(card.reference.as_deref())
    .bind(card.hint.as_deref())
    .bind(OffsetDateTime::now_utc())
    .bind(card_id)
    .bind(user_id)
    .execute(db)
    .await
    .context("update card")?;
    Ok(result.rows_affected())
}

pub async fn delete_for_user(db: &SqlitePool, user_id: i64, card_id: i64) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM cards WHERE id = ? AND user_id = ?")
        .bind(card_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete card")?;
    Ok(result.rows_affected())
}
