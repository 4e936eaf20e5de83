//! # REST API for the session
//!
//! Signing in switches the live state to the cloud backend for that identity;
//! signing out returns to local storage.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;
use shared::SignInRequest;

use super::error_mapping::error_response;
use super::mappers::StateMapper;
use crate::domain::errors::{DomainError, FieldErrors};
use crate::AppState;

/// Routes under `/api/session`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
}

pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(StateMapper::to_session_dto(state.state_manager.snapshot())))
}

pub async fn sign_in(State(state): State<AppState>, Json(request): Json<SignInRequest>) -> impl IntoResponse {
    info!("POST /api/session/sign-in - {}", request.email);

    let mut errors = FieldErrors::new();
    if request.uid.trim().is_empty() {
        errors.push("uid", "is required");
    }
    if request.email.trim().is_empty() {
        errors.push("email", "is required");
    }
    if let Err(e) = errors.into_result() {
        return error_response("Invalid sign-in", e.into());
    }

    match state.state_manager.sign_in(StateMapper::to_identity(request)).await {
        Ok(()) => (StatusCode::OK, Json(StateMapper::to_session_dto(state.state_manager.snapshot()))).into_response(),
        Err(e) => error_response("Failed to sign in", e),
    }
}

pub async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/session/sign-out");

    if state.state_manager.identity().is_none() {
        return error_response("Failed to sign out", DomainError::NotSignedIn.into());
    }
    match state.state_manager.sign_out().await {
        Ok(()) => (StatusCode::OK, Json(StateMapper::to_session_dto(state.state_manager.snapshot()))).into_response(),
        Err(e) => error_response("Failed to sign out", e),
    }
}
