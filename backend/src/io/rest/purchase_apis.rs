//! # REST API for Purchases
//!
//! Create, edit, delete and list purchases. Discounts are always computed by
//! the backend from the current settings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use log::info;
use shared::{CreatePurchaseRequest, DeletePurchaseResponse, PurchaseResponse, UpdatePurchaseRequest};

use super::error_mapping::error_response;
use super::mappers::PurchaseMapper;
use crate::domain::purchase_service::SavePurchaseResult;
use crate::AppState;

/// Routes under `/api/purchases`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:purchase_id", put(update_purchase).delete(delete_purchase))
}

fn to_response(result: SavePurchaseResult, action: &str) -> PurchaseResponse {
    let success_message = if result.merchant_created {
        format!("Purchase {} and merchant '{}' registered", action, result.purchase.merchant_name)
    } else {
        format!("Purchase {}", action)
    };
    PurchaseResponse {
        purchase: PurchaseMapper::to_dto(result.purchase),
        merchant_created: result.merchant_created,
        success_message,
    }
}

/// List purchases, most recent first
pub async fn list_purchases(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/purchases");
    let purchases = state.purchase_service.list_purchases();
    (StatusCode::OK, Json(PurchaseMapper::to_list_dto(purchases)))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    Json(request): Json<CreatePurchaseRequest>,
) -> impl IntoResponse {
    info!("POST /api/purchases - request: {:?}", request);

    let command = match PurchaseMapper::to_command(request) {
        Ok(command) => command,
        Err(e) => return error_response("Invalid purchase", e.into()),
    };
    match state.purchase_service.add_purchase(command).await {
        Ok(result) => (StatusCode::CREATED, Json(to_response(result, "saved"))).into_response(),
        Err(e) => error_response("Failed to save purchase", e),
    }
}

pub async fn update_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<String>,
    Json(request): Json<UpdatePurchaseRequest>,
) -> impl IntoResponse {
    info!("PUT /api/purchases/{} - request: {:?}", purchase_id, request);

    let command = match PurchaseMapper::to_command(request) {
        Ok(command) => command,
        Err(e) => return error_response("Invalid purchase", e.into()),
    };
    match state.purchase_service.update_purchase(&purchase_id, command).await {
        Ok(result) => (StatusCode::OK, Json(to_response(result, "updated"))).into_response(),
        Err(e) => error_response("Failed to update purchase", e),
    }
}

pub async fn delete_purchase(State(state): State<AppState>, Path(purchase_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/purchases/{}", purchase_id);

    match state.purchase_service.delete_purchase(&purchase_id).await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(DeletePurchaseResponse {
                deleted_id: deleted.id,
                success_message: "Purchase deleted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to delete purchase", e),
    }
}
