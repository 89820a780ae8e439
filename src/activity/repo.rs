use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use super::ActivityRecord;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<sqlx::types::Json<serde_json::Value>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn insert(db: &SqlitePool, rec: &ActivityRecord) -> anyhow::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_logs
            (user_id, action, resource_type, resource_id, details, ip_address, user_agent, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rec.user_id)
    .bind(rec.action)
    .bind(rec.resource_type)
    .bind(rec.resource_id)
    .bind(rec.details.as_ref().map(sqlx::types::Json))
    .bind(rec.ip_address.as_deref())
    .bind(rec.user_agent.as_deref())
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await
    .context("insert activity log")?;
    Ok(result.last_insert_rowid())
}

/// Newest first. Ids follow insertion order, so they order by creation.
pub async fn list_recent(
    db: &SqlitePool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ActivityEntry>> {
    let rows = sqlx::query_as::<_, ActivityEntry>(
        r#"
        SELECT id, user_id, action, resource_type, resource_id, details,
               ip_address, user_agent, created_at
          FROM activity_logs
         ORDER BY id DESC
         LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list activity logs")?;
    Ok(rows)
}
