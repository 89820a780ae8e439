//! Router-level test harness: in-memory state, the real router, and a fixed
//! peer address.

use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, "medstudy-tests");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_state(AppState::fake().await)
    }

    pub fn with_state(state: AppState) -> Self {
        let router = build_app(state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        Self { state, router }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        send(&self.router, Method::GET, uri, token, None).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, token, Some(body)).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        send(&self.router, Method::DELETE, uri, token, None).await
    }

    /// Registers a user and returns the response body.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                None,
                json!({ "username": username, "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn token_for(&self, username: &str, email: &str, password: &str) -> String {
        let body = self.register(username, email, password).await;
        body["token"].as_str().unwrap().to_owned()
    }

    /// Registers a user, promotes them in the database, and logs in again so
    /// the token carries the admin role.
    pub async fn admin_token(&self, username: &str) -> String {
        let email = format!("{username}@admin.test");
        self.register(username, &email, "adminpass").await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
            .bind(username)
            .execute(&self.state.db)
            .await
            .unwrap();
        let (status, body) = self
            .post_json(
                "/api/auth/login",
                None,
                json!({ "username": username, "password": "adminpass" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_owned()
    }

    /// Waits for the activity writer to persist at least `n` records and
    /// returns their actions, newest first.
    pub async fn wait_for_activity(&self, n: usize) -> Vec<String> {
        for _ in 0..200 {
            let actions: Vec<String> =
                sqlx::query_scalar("SELECT action FROM activity_logs ORDER BY id DESC")
                    .fetch_all(&self.state.db)
                    .await
                    .unwrap();
            if actions.len() >= n {
                return actions;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("activity writer did not persist {n} records");
    }
}
