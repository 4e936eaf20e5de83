//! # REST API for cloud-file backups
//!
//! The client passes the file store access token it holds, with its expiry,
//! on every call. Nothing is cached server side.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use chrono::{DateTime, Utc};
use log::info;
use shared::{CloudBackupRequest, CloudBackupResponse, CloudRestoreResponse};

use super::error_mapping::error_response;
use crate::domain::errors::DomainError;
use crate::AppState;

/// Routes under `/api/backup`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cloud", post(backup_to_cloud))
        .route("/cloud/restore", post(restore_from_cloud))
}

fn parse_expiry(request: &CloudBackupRequest) -> Result<Option<DateTime<Utc>>, DomainError> {
    match request.expires_at.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| DomainError::invalid("expires_at", "must be an RFC 3339 timestamp")),
    }
}

pub async fn backup_to_cloud(
    State(state): State<AppState>,
    Json(request): Json<CloudBackupRequest>,
) -> impl IntoResponse {
    info!("POST /api/backup/cloud");

    let expires_at = match parse_expiry(&request) {
        Ok(expires_at) => expires_at,
        Err(e) => return error_response("Invalid backup request", e.into()),
    };
    match state
        .backup_service
        .backup_to_cloud(request.access_token.as_deref(), expires_at, Utc::now())
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(CloudBackupResponse {
                success_message: format!("Backup saved to '{}'", outcome.file.name),
                file_id: outcome.file.id,
                file_name: outcome.file.name,
                updated_existing: outcome.updated_existing,
                timestamp: outcome.timestamp.to_rfc3339(),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to back up to the cloud", e),
    }
}

pub async fn restore_from_cloud(
    State(state): State<AppState>,
    Json(request): Json<CloudBackupRequest>,
) -> impl IntoResponse {
    info!("POST /api/backup/cloud/restore");

    let expires_at = match parse_expiry(&request) {
        Ok(expires_at) => expires_at,
        Err(e) => return error_response("Invalid restore request", e.into()),
    };
    match state
        .backup_service
        .restore_and_apply(request.access_token.as_deref(), expires_at, Utc::now())
        .await
    {
        Ok(applied) => (
            StatusCode::OK,
            Json(CloudRestoreResponse {
                purchase_count: applied.purchase_count,
                merchant_count: applied.merchant_count,
                settings_restored: applied.settings_restored,
                success_message: format!(
                    "Restored {} purchases and {} merchants from the cloud",
                    applied.purchase_count, applied.merchant_count
                ),
            }),
        )
            .into_response(),
        Err(e) => error_response("Failed to restore from the cloud", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(expires_at: Option<&str>) -> CloudBackupRequest {
        CloudBackupRequest {
            access_token: Some("tok".to_string()),
            expires_at: expires_at.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry(&request(None)).unwrap(), None);
        assert_eq!(parse_expiry(&request(Some(" "))).unwrap(), None);
        assert!(parse_expiry(&request(Some("2025-05-01T12:00:00Z"))).unwrap().is_some());
        assert!(matches!(
            parse_expiry(&request(Some("tomorrow"))),
            Err(DomainError::Validation(_))
        ));
    }
}
