use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    activity::ActivityRecord,
    auth::{
        claims::Identity,
        dto::{AuthResponse, LoginRequest, ProfileResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        password::{hash_password_blocking, verify_against_dummy, verify_password_blocking},
        repo_types::User,
    },
    error::{is_unique_violation, AppError, AppResult},
    extract::{non_blank, ApiJson, ClientInfo},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload), fields(username = ?payload.username))]
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    // Short passwords, empty included, are reported first, whatever else is wrong.
    if let Some(pw) = payload.password.as_deref() {
        if pw.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AppError::validation(
                "Password must be at least 6 characters long",
            ));
        }
    }

    let (Some(username), Some(email), Some(password)) = (
        non_blank(payload.username),
        non_blank(payload.email).map(|e| e.to_lowercase()),
        payload.password,
    ) else {
        return Err(AppError::validation(
            "Username, email, and password are required",
        ));
    };

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    if User::exists_with(&state.db, &username, &email).await? {
        warn!(%username, %email, "username or email already registered");
        return Err(AppError::Conflict("Username or email already exists"));
    }

    let hash = hash_password_blocking(password).await?;

    let user = match User::create(&state.db, &username, &email, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(%username, %email, "registration lost a uniqueness race");
            return Err(AppError::Conflict("Username or email already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.jwt.sign(&Identity::from(&user))?;

    state.activity.record(
        ActivityRecord::new(user.id, "user_registered")
            .resource("users", user.id)
            .details(json!({ "username": user.username, "email": user.email }))
            .client(&client),
    );
    info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload), fields(login = ?payload.username))]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(login), Some(password)) = (
        non_blank(payload.username),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Username and password are required"));
    };

    let invalid = || AppError::Unauthenticated("Invalid credentials");

    let Some(user) = User::find_by_login(&state.db, &login).await? else {
        warn!(%login, "login for unknown user");
        verify_against_dummy(password).await;
        return Err(invalid());
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        warn!(user_id = user.id, "login for deactivated account");
        return Err(invalid());
    }

    let token = state.jwt.sign(&Identity::from(&user))?;

    state.activity.record(
        ActivityRecord::new(user.id, "user_login")
            .resource("users", user.id)
            .client(&client),
    );
    info!(user_id = user.id, username = %user.username, "user logged in");

    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, identity), fields(user_id = identity.id))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, identity.id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(Json(user.into()))
}
