use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{FeedbackRequest, SubmittedResponse},
    repo::{self, Feedback, NewFeedback},
};
use crate::{
    activity::ActivityRecord,
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{non_blank, ApiJson, ClientInfo},
    state::AppState,
};

pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/feedback", get(list_feedback).post(submit_feedback))
}

impl TryFrom<FeedbackRequest> for NewFeedback {
    type Error = AppError;

    fn try_from(req: FeedbackRequest) -> Result<Self, Self::Error> {
        let question_id = non_blank(req.question_id)
            .ok_or_else(|| AppError::validation("Question ID is required"))?;
        if let Some(rating) = req.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::validation("Rating must be between 1 and 5"));
            }
        }
        Ok(NewFeedback {
            question_id,
            rating: req.rating,
            feedback_text: req.feedback_text.filter(|t| !t.trim().is_empty()),
            is_helpful: req.is_helpful,
        })
    }
}

#[instrument(skip(state, identity, client, body), fields(user_id = identity.id))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    client: ClientInfo,
    ApiJson(body): ApiJson<FeedbackRequest>,
) -> AppResult<Json<SubmittedResponse>> {
    let fb = NewFeedback::try_from(body)?;
    let id = repo::insert(&state.db, identity.id, &fb).await?;

    state.activity.record(
        ActivityRecord::new(identity.id, "feedback_submitted")
            .resource("question_feedback", id)
            .details(json!({ "question_id": fb.question_id, "rating": fb.rating }))
            .client(&client),
    );
    info!(feedback_id = id, question_id = %fb.question_id, "feedback submitted");

    Ok(Json(SubmittedResponse {
        id,
        message: "Feedback submitted successfully",
    }))
}

#[instrument(skip(state, identity), fields(user_id = identity.id))]
pub async fn list_feedback(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<Vec<Feedback>>> {
    Ok(Json(repo::list_by_user(&state.db, identity.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn submit_returns_id_and_message() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        let (status, body) = app
            .post_json(
                "/api/feedback",
                Some(&alice),
                json!({ "question_id": 1, "rating": 5, "feedback_text": "Great question!", "is_helpful": true }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 1, "message": "Feedback submitted successfully" }));

        let actions = app.wait_for_activity(2).await;
        assert_eq!(actions[0], "feedback_submitted");
    }

    #[tokio::test]
    async fn question_id_is_required() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        let (status, body) = app
            .post_json(
                "/api/feedback",
                Some(&alice),
                json!({ "rating": 5, "feedback_text": "Missing question ID" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Question ID is required");
    }

    #[tokio::test]
    async fn rating_must_be_in_range() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        for rating in [0, 6] {
            let (status, body) = app
                .post_json("/api/feedback", Some(&alice), json!({ "question_id": 1, "rating": rating }))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Rating must be between 1 and 5");
        }
    }

    #[tokio::test]
    async fn list_returns_only_own_feedback_newest_first() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        let bob = app.token_for("bob", "bob@x.com", "secret1").await;
        for q in [1, 2] {
            app.post_json("/api/feedback", Some(&alice), json!({ "question_id": q }))
                .await;
        }
        app.post_json("/api/feedback", Some(&bob), json!({ "question_id": 3 }))
            .await;

        let (status, body) = app.get("/api/feedback", Some(&alice)).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["question_id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn string_question_ids_from_the_web_client_are_accepted() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        for qid in ["12", "q1"] {
            let (status, body) = app
                .post_json(
                    "/api/feedback",
                    Some(&alice),
                    json!({ "question_id": qid, "rating": 5, "feedback_text": "Clear stem", "is_helpful": true }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["message"], "Feedback submitted successfully");
        }

        let (_, list) = app.get("/api/feedback", Some(&alice)).await;
        assert_eq!(list[0]["question_id"], "q1");
        assert_eq!(list[1]["question_id"], "12");

        let (status, body) = app
            .post_json("/api/feedback", Some(&alice), json!({ "question_id": "  " }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Question ID is required");
    }
}
