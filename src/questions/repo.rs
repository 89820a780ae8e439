use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GeneratedQuestion {
    pub id: i64,
    pub user_id: i64,
    pub question: String,
    pub answer: Option<String>,
    pub explanation: Option<String>,
    pub question_type: Option<String>,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
    pub model: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub answer: Option<String>,
    pub explanation: Option<String>,
    pub question_type: Option<String>,
    pub difficulty: Option<String>,
    pub topic: Option<String>,
    pub model: Option<String>,
}

pub async fn insert(db: &SqlitePool, user_id: i64, q: &NewQuestion) -> anyhow::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO generated_questions
            (user_id, question, answer, explanation, question_type, difficulty, topic, model, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&q.question)
    .bind(q.answer.as_deref())
    .bind(q.explanation.as_deref())
    .bind(q.question_type.as_deref())
    .bind(q.difficulty.as_deref())
    .bind(q.topic.as_deref())
    .bind(q.model.as_deref())
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await
    .context("insert generated question")?;
    Ok(result.last_insert_rowid())
}

pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<GeneratedQuestion>> {
    let rows = sqlx::query_as::<_, GeneratedQuestion>(
        r#"
        SELECT id, user_id, question, answer, explanation, question_type, difficulty, topic, model, created_at
          FROM generated_questions
         WHERE user_id = ?
         ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list generated questions")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo_types::User, db::memory_pool};

    #[tokio::test]
    async fn insert_and_list_by_owner() {
        let db = memory_pool().await;
        let alice = User::create(&db, "alice", "a@x.com", "h").await.unwrap();
        let bob = User::create(&db, "bob", "b@x.com", "h").await.unwrap();
        let q = NewQuestion {
            question: "Which nerve innervates the deltoid?".into(),
            answer: Some("Axillary".into()),
            topic: Some("anatomy".into()),
            ..Default::default()
        };
        insert(&db, alice.id, &q).await.unwrap();
        insert(&db, bob.id, &q).await.unwrap();

        let rows = list_by_user(&db, alice.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answer.as_deref(), Some("Axillary"));
        assert_eq!(rows[0].user_id, alice.id);
    }
}
