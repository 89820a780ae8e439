use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{CardRequest, CreatedResponse, MessageResponse},
    repo::{self, Card, CardContent},
};
use crate::{
    activity::ActivityRecord,
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{non_blank, ApiJson, ApiPath, ClientInfo},
    state::AppState,
};

const NOT_FOUND: AppError = AppError::NotFound("Card not found or access denied");

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(create_card))
        .route(
            "/cards/:id",
            get(get_card).put(update_card).delete(delete_card),
        )
}

impl TryFrom<CardRequest> for CardContent {
    type Error = AppError;

    fn try_from(req: CardRequest) -> Result<Self, Self::Error> {
        let (Some(question), Some(answer)) = (non_blank(req.question), non_blank(req.answer)) else {
            return Err(AppError::validation("Question and answer are required"));
        };
        Ok(CardContent {
            question,
            answer,
            difficulty: non_blank(req.difficulty),
            tags: req.tags,
            reference: non_blank(req.reference),
            hint: non_blank(req.hint),
        })
    }
}

#[instrument(skip(state, identity), fields(user_id = identity.id))]
pub async fn list_cards(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<Vec<Card>>> {
    let cards = repo::list_by_user(&state.db, identity.id).await?;
    Ok(Json(cards))
}

#[instrument(skip(state, identity), fields(user_id = identity.id))]
pub async fn get_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Card>> {
    repo::get_for_user(&state.db, identity.id, id)
        .await?
        .map(Json)
        .ok_or(NOT_FOUND)
}

#[instrument(skip(state, identity, client, body), fields(user_id = identity.id))]
pub async fn create_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    client: ClientInfo,
    ApiJson(body): ApiJson<CardRequest>,
) -> AppResult<Json<CreatedResponse>> {
    let card = CardContent::try_from(body)?;
    let id = repo::insert(&state.db, identity.id, &card).await?;

    state.activity.record(
        ActivityRecord::new(identity.id, "card_created")
            .resource("cards", id)
            .details(json!({ "question": card.question }))
            .client(&client),
    );
    info!(card_id = id, "card created");

    Ok(Json(CreatedResponse {
        id,
        message: "Card created successfully",
    }))
}

#[instrument(skip(state, identity, client, body), fields(user_id = identity.id))]
pub async fn update_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CardRequest>,
) -> AppResult<Json<MessageResponse>> {
    let card = CardContent::try_from(body)?;
    if repo::update_for_user(&state.db, identity.id, id, &card).await? == 0 {
        return Err(NOT_FOUND);
    }

    state.activity.record(
        ActivityRecord::new(identity.id, "card_updated")
            .resource("cards", id)
            .details(json!({ "question": card.question }))
            .client(&client),
    );

    Ok(Json(MessageResponse {
        message: "Card updated successfully",
    }))
}

#[instrument(skip(state, identity, client), fields(user_id = identity.id))]
pub async fn delete_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    if repo::delete_for_user(&state.db, identity.id, id).await? == 0 {
        return Err(NOT_FOUND);
    }

    state.activity.record(
        ActivityRecord::new(identity.id, "card_deleted")
            .resource("cards", id)
            .client(&client),
    );
    info!(card_id = id, "card deleted");

    Ok(Json(MessageResponse {
        message: "Card deleted successfully",
    }))
}
