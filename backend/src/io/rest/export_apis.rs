//! # REST API for file export and workbook restore
//!
//! Exports stream the generated file back with a download disposition. The
//! restore endpoint takes the raw `.xlsx` bytes as the request body.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use log::info;
use shared::RestoreWorkbookResponse;

use super::error_mapping::error_response;
use crate::domain::export_service::ExportFile;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export/csv", get(export_csv))
        .route("/export/workbook", get(export_workbook))
        .route(
            "/import/workbook",
            post(import_workbook).layer(DefaultBodyLimit::max(MAX_WORKBOOK_BYTES)),
        )
}

/// Workbook uploads larger than this are rejected before parsing
pub const MAX_WORKBOOK_BYTES: usize = 20 * 1024 * 1024;

fn file_response(file: ExportFile) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response()
}

pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/export/csv");

    match state.export_service.export_csv(Utc::now()) {
        Ok(file) => file_response(file),
        Err(e) => error_response("Failed to export purchases", e),
    }
}

pub async fn export_workbook(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/export/workbook");

    match state.export_service.export_workbook(Utc::now()).await {
        Ok(file) => file_response(file),
        Err(e) => error_response("Failed to export workbook", e),
    }
}

pub async fn import_workbook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!("POST /api/import/workbook - {} bytes", body.len());

    match state.import_service.restore_workbook(&body, Utc::now()).await {
        Ok(parsed) => {
            let success_message = format!(
                "Restored {} purchases and {} merchants",
                parsed.purchases.len(),
                parsed.merchants.len()
            );
            (
                StatusCode::OK,
                Json(RestoreWorkbookResponse {
                    purchase_count: parsed.purchases.len(),
                    merchant_count: parsed.merchants.len(),
                    warnings: parsed.warnings,
                    success_message,
                }),
            )
                .into_response()
        }
        Err(e) => error_response("Failed to restore workbook", e),
    }
}
