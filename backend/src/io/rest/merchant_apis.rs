//! # REST API for Merchants

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::info;
use shared::{AddMerchantRequest, MerchantResponse};

use super::error_mapping::error_response;
use super::mappers::MerchantMapper;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_merchants).post(add_merchant))
}

/// List merchants ordered by name
pub async fn list_merchants(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/merchants");
    (
        StatusCode::OK,
        Json(MerchantMapper::to_list_dto(state.merchant_service.list_merchants())),
    )
}

pub async fn add_merchant(State(state): State<AppState>, Json(request): Json<AddMerchantRequest>) -> impl IntoResponse {
    info!("POST /api/merchants - request: {:?}", request);

    match state
        .merchant_service
        .add_merchant(&request.name, request.location.as_deref())
        .await
    {
        Ok(merchant) => (
            StatusCode::CREATED,
            Json(MerchantResponse {
                success_message: format!("Merchant '{}' added", merchant.name),
                merchant: MerchantMapper::to_dto(merchant),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to add merchant", e),
    }
}
