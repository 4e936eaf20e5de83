//! # REST API for the contact form

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use log::info;
use shared::{ContactRequest, ContactResponse};

use super::error_mapping::error_response;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_contact))
}

pub async fn send_contact(State(state): State<AppState>, Json(request): Json<ContactRequest>) -> impl IntoResponse {
    info!("POST /api/contact - from {}", request.email);

    match state.contact_service.send(&request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ContactResponse {
                success_message: "Thanks! Your message was sent.".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to send message", e),
    }
}
