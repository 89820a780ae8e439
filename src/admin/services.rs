use sqlx::SqlitePool;
use tracing::error;

use super::{dto::Analytics, repo};

const TOTAL_USERS: &str = "SELECT COUNT(*) FROM users";
const ACTIVE_USERS: &str = "SELECT COUNT(*) FROM users WHERE is_active = 1";
const TOTAL_CARDS: &str = "SELECT COUNT(*) FROM cards";
const TOTAL_QUESTIONS: &str = "SELECT COUNT(*) FROM generated_questions";
const TOTAL_FEEDBACK: &str = "SELECT COUNT(*) FROM question_feedback";

/// Runs the counts concurrently. A failing count reads as zero.
pub async fn analytics(db: &SqlitePool) -> Analytics {
    let (total_users, active_users, total_cards, total_questions, total_feedback) = tokio::join!(
        metric(db, "total_users", TOTAL_USERS),
        metric(db, "active_users", ACTIVE_USERS),
        metric(db, "total_cards", TOTAL_CARDS),
        metric(db, "total_questions", TOTAL_QUESTIONS),
        metric(db, "total_feedback", TOTAL_FEEDBACK),
    );
    Analytics {
        total_users,
        active_users,
        total_cards,
        total_questions,
        total_feedback,
    }
}

async fn metric(db: &SqlitePool, name: &'static str, sql: &str) -> i64 {
    repo::count(db, sql).await.unwrap_or_else(|e| {
        error!(metric = name, error = ?e, "admin analytics query failed");
        0
    })
}
