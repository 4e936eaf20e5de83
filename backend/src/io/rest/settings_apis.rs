//! # REST API for Benefit Settings
//!
//! Partial updates of the settings singleton and the one-time initial setup.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;
use shared::{InitialSetupRequest, SettingsResponse, UpdateSettingsRequest};

use super::error_mapping::error_response;
use super::mappers::SettingsMapper;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/setup", post(complete_setup))
}

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/settings");
    (StatusCode::OK, Json(SettingsMapper::to_dto(state.settings_service.get_settings())))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> impl IntoResponse {
    info!("PUT /api/settings - request: {:?}", request);

    match state.settings_service.update_settings(&request).await {
        Ok(settings) => (
            StatusCode::OK,
            Json(SettingsResponse {
                settings: SettingsMapper::to_dto(settings),
                success_message: "Settings saved".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to save settings", e),
    }
}

pub async fn complete_setup(
    State(state): State<AppState>,
    Json(request): Json<InitialSetupRequest>,
) -> impl IntoResponse {
    info!("POST /api/setup - request: {:?}", request);

    match state.settings_service.complete_initial_setup(&request).await {
        Ok(settings) => (
            StatusCode::OK,
            Json(SettingsResponse {
                settings: SettingsMapper::to_dto(settings),
                success_message: "Setup complete".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to complete setup", e),
    }
}
