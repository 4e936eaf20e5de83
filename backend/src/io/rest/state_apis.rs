//! # REST API for the live state
//!
//! Full state snapshot, monthly summary and user-visible notices.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use log::info;
use shared::NotificationListResponse;

use super::error_mapping::error_response;
use super::mappers::StateMapper;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/summary", get(get_summary))
        .route("/notifications", get(list_notifications))
}

pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/state");

    match state.settings_service.is_setup_complete() {
        Ok(setup_complete) => {
            let snapshot = state.state_manager.snapshot();
            (StatusCode::OK, Json(StateMapper::to_state_dto(snapshot, setup_complete))).into_response()
        }
        Err(e) => error_response("Failed to load state", e),
    }
}

pub async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/summary");
    let summary = state.summary_service.monthly_summary(Utc::now());
    (StatusCode::OK, Json(StateMapper::to_summary_dto(summary)))
}

pub async fn list_notifications(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(NotificationListResponse {
            notices: state.notifications.recent(),
        }),
    )
}
