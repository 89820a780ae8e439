//! Storage for tutor questions produced by the external generator.

mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::question_routes()
}
