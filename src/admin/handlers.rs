use axum::{
    extract::State,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{Analytics, MessageResponse, Pagination, RespondRequest, SetActiveRequest},
    repo::{self, UserSummary},
    services,
};
use crate::{
    activity::{self, repo::ActivityEntry, ActivityRecord},
    auth::extractors::AdminUser,
    error::{AppError, AppResult},
    extract::{non_blank, ApiJson, ApiPath, ApiQuery, ClientInfo},
    feedback,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/active", patch(set_user_active))
        .route("/admin/users/:id/promote", post(promote_user))
        .route("/admin/analytics", get(analytics))
        .route("/admin/feedback/:id/response", post(respond_to_feedback))
        .route("/admin/activity", get(recent_activity))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(repo::list_users(&state.db).await?))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn analytics(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Json<Analytics> {
    Json(services::analytics(&state.db).await)
}

#[instrument(skip(state, admin, client, body), fields(admin_id = admin.id))]
pub async fn set_user_active(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(body): ApiJson<SetActiveRequest>,
) -> AppResult<Json<MessageResponse>> {
    let active = body
        .is_active
        .ok_or_else(|| AppError::validation("is_active is required"))?;
    if repo::set_active(&state.db, user_id, active).await? == 0 {
        return Err(AppError::NotFound("User not found"));
    }

    let (action, message) = if active {
        ("user_activated", "User activated")
    } else {
        ("user_deactivated", "User deactivated")
    };
    state.activity.record(
        ActivityRecord::new(admin.id, action)
            .resource("users", user_id)
            .client(&client),
    );
    info!(user_id, active, "user active flag changed");

    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state, admin, client), fields(admin_id = admin.id))]
pub async fn promote_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    if repo::promote_to_admin(&state.db, user_id).await? == 0 {
        return Err(AppError::NotFound("User not found"));
    }

    state.activity.record(
        ActivityRecord::new(admin.id, "user_promoted")
            .resource("users", user_id)
            .client(&client),
    );
    info!(user_id, "user promoted to admin");

    Ok(Json(MessageResponse {
        message: "User promoted to admin",
    }))
}

#[instrument(skip(state, admin, client, body), fields(admin_id = admin.id))]
pub async fn respond_to_feedback(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    ApiPath(feedback_id): ApiPath<i64>,
    ApiJson(body): ApiJson<RespondRequest>,
) -> AppResult<Json<MessageResponse>> {
    let response = non_blank(body.response)
        .ok_or_else(|| AppError::validation("Response text is required"))?;

    if feedback::repo::set_response(&state.db, feedback_id, &response).await? == 0 {
        return Err(AppError::NotFound("Feedback not found"));
    }

    state.activity.record(
        ActivityRecord::new(admin.id, "feedback_responded")
            .resource("question_feedback", feedback_id)
            .details(json!({ "length": response.chars().count() }))
            .client(&client),
    );

    Ok(Json(MessageResponse {
        message: "Response saved",
    }))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn recent_activity(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    let (limit, offset) = p.clamped();
    Ok(Json(activity::repo::list_recent(&state.db, limit, offset).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use axum::http::StatusCode;

    const ADMIN_GETS: [&str; 3] = ["/api/admin/users", "/api/admin/analytics", "/api/admin/activity"];

    #[tokio::test]
    async fn no_token_is_401_and_user_token_is_403() {
        let app = TestApp::new().await;
        let user = app.token_for("alice", "alice@x.com", "secret1").await;

        for uri in ADMIN_GETS {
            let (status, body) = app.get(uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Authentication required");

            let (status, body) = app.get(uri, Some("not-a-token")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Invalid or expired token");

            let (status, body) = app.get(uri, Some(&user)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["error"], "Admin access required");
        }

        let (status, _) = app.post_json("/api/admin/users/1/promote", Some(&user), json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn denied_admin_access_is_audited() {
        let app = TestApp::new().await;
        let user = app.token_for("alice", "alice@x.com", "secret1").await;
        app.get("/api/admin/users", Some(&user)).await;

        let actions = app.wait_for_activity(2).await;
        assert_eq!(actions[0], "admin_access_denied");
    }

    #[tokio::test]
    async fn admin_sees_users_with_counts() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        app.post_json("/api/cards", Some(&alice), json!({ "question": "Q", "answer": "A" }))
            .await;
        let admin = app.admin_token("root").await;

        let (status, users) = app.get("/api/admin/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["username"], "root");
        assert_eq!(users[0]["role"], "admin");
        assert_eq!(users[1]["username"], "alice");
        assert_eq!(users[1]["card_count"], 1);
        assert_eq!(users[1]["question_count"], 0);
        assert!(users[1].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn analytics_reports_all_metrics() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        app.post_json("/api/cards", Some(&alice), json!({ "question": "Q", "answer": "A" }))
            .await;
        app.post_json("/api/questions", Some(&alice), json!({ "question": "Q?" }))
            .await;
        app.post_json("/api/feedback", Some(&alice), json!({ "question_id": 1, "rating": 4 }))
            .await;
        let admin = app.admin_token("root").await;

        let (status, body) = app.get("/api/admin/analytics", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "total_users": 2,
                "active_users": 2,
                "total_cards": 1,
                "total_questions": 1,
                "total_feedback": 1
            })
        );
    }

    #[tokio::test]
    async fn deactivation_blocks_login_and_promotion_sticks() {
        let app = TestApp::new().await;
        app.register("alice", "alice@x.com", "secret1").await;
        let admin = app.admin_token("root").await;

        let (status, body) = app
            .patch_json("/api/admin/users/1/active", Some(&admin), json!({ "is_active": false }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deactivated");
        let (status, _) = app
            .post_json("/api/auth/login", None, json!({ "username": "alice", "password": "secret1" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.patch_json("/api/admin/users/1/active", Some(&admin), json!({ "is_active": true }))
            .await;
        let (status, body) = app.post_json("/api/admin/users/1/promote", Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User promoted to admin");

        let (status, body) = app
            .post_json("/api/auth/login", None, json!({ "username": "alice", "password": "secret1" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");

        let (status, _) = app
            .patch_json("/api/admin/users/99/active", Some(&admin), json!({ "is_active": true }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = app
            .patch_json("/api/admin/users/1/active", Some(&admin), json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "is_active is required");
    }

    #[tokio::test]
    async fn admin_can_respond_to_feedback() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        app.post_json("/api/feedback", Some(&alice), json!({ "question_id": 7, "is_helpful": false }))
            .await;
        let admin = app.admin_token("root").await;

        let (status, body) = app
            .post_json("/api/admin/feedback/1/response", Some(&admin), json!({ "response": "  " }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Response text is required");

        let (status, body) = app
            .post_json("/api/admin/feedback/9/response", Some(&admin), json!({ "response": "ok" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Feedback not found");

        let (status, _) = app
            .post_json("/api/admin/feedback/1/response", Some(&admin), json!({ "response": "Reworded the stem" }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, mine) = app.get("/api/feedback", Some(&alice)).await;
        assert_eq!(mine[0]["admin_response"], "Reworded the stem");
    }

    #[tokio::test]
    async fn activity_feed_is_paginated() {
        let app = TestApp::new().await;
        let alice = app.token_for("alice", "alice@x.com", "secret1").await;
        for _ in 0..3 {
            app.post_json("/api/cards", Some(&alice), json!({ "question": "Q", "answer": "A" }))
                .await;
        }
        let admin = app.admin_token("root").await;
        app.wait_for_activity(6).await;

        let (status, page) = app.get("/api/admin/activity?limit=2", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page.as_array().unwrap().len(), 2);
        assert_eq!(page[0]["action"], "user_login");

        let (_, all) = app.get("/api/admin/activity", Some(&admin)).await;
        let all = all.as_array().unwrap();
        assert!(all.iter().any(|e| e["action"] == "card_created" && e["ip_address"] == "127.0.0.1"));
        assert!(all.iter().all(|e| e["user_agent"] == "medstudy-tests"));

        let (status, body) = app.get("/api/admin/activity?limit=lots", Some(&admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid query parameters");
    }
}
