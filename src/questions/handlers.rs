use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tracing::instrument;

use super::{
    dto::{SaveQuestionRequest, SavedResponse},
    repo::{self, GeneratedQuestion, NewQuestion},
};
use crate::{
    activity::ActivityRecord,
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{non_blank, ApiJson, ClientInfo},
    state::AppState,
};

pub fn question_routes() -> Router<AppState> {
    Router::new().route("/questions", get(list_questions).post(save_question))
}

impl TryFrom<SaveQuestionRequest> for NewQuestion {
    type Error = AppError;

    fn try_from(req: SaveQuestionRequest) -> Result<Self, Self::Error> {
        let question =
            non_blank(req.question).ok_or_else(|| AppError::validation("Question text is required"))?;
        Ok(NewQuestion {
            question,
            answer: non_blank(req.answer),
            explanation: non_blank(req.explanation),
            question_type: non_blank(req.question_type),
            difficulty: non_blank(req.difficulty),
            topic: non_blank(req.topic),
            model: non_blank(req.model),
        })
    }
}

#[instrument(skip(state, identity), fields(user_id = identity.id))]
pub async fn list_questions(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<Vec<GeneratedQuestion>>> {
    Ok(Json(repo::list_by_user(&state.db, identity.id).await?))
}

#[instrument(skip(state, identity, client, body), fields(user_id = identity.id))]
pub async fn save_question(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    client: ClientInfo,
    ApiJson(body): ApiJson<SaveQuestionRequest>,
) -> AppResult<Json<SavedResponse>> {
    let q = NewQuestion::try_from(body)?;
    let id = repo::insert(&state.db, identity.id, &q).await?;

    state.activity.record(
        ActivityRecord::new(identity.id, "question_saved")
            .resource("generated_questions", id)
            .details(json!({ "topic": q.topic, "model": q.model }))
            .client(&client),
    );

    Ok(Json(SavedResponse {
        id,
        message: "Question saved successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn save_then_list() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        let (status, body) = app
            .post_json(
                "/api/questions",
                Some(&alice),
                json!({ "question": "First-line drug for absence seizures?", "answer": "Ethosuximide", "model": "gpt-4o" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 1, "message": "Question saved successfully" }));

        let (status, list) = app.get("/api/questions", Some(&alice)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["answer"], "Ethosuximide");
        assert_eq!(list[0]["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        let (status, body) = app
            .post_json("/api/questions", Some(&alice), json!({ "question": "   " }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Question text is required");
    }
}
