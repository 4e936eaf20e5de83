//! Translation of domain failures into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::{error, warn};
use shared::ErrorResponse;

use crate::domain::errors::DomainError;

fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound { .. } | DomainError::BackupNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateMerchant { .. } => StatusCode::CONFLICT,
        DomainError::MissingSheet(_)
        | DomainError::MalformedWorkbook(_)
        | DomainError::MalformedBackup(_)
        | DomainError::NothingToExport
        | DomainError::NotSignedIn => StatusCode::BAD_REQUEST,
        DomainError::MissingAccessToken | DomainError::AccessTokenExpired => StatusCode::UNAUTHORIZED,
        DomainError::Remote(_) => StatusCode::BAD_GATEWAY,
        DomainError::RemoteTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DomainError::ContactNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Build the error response for a failed request.
///
/// Domain errors keep their message; anything else is logged and reported
/// with the generic `failure` text.
pub fn error_response(failure: &str, e: anyhow::Error) -> Response {
    match e.downcast_ref::<DomainError>() {
        Some(domain) => {
            let status = status_for(domain);
            warn!("{}: {}", failure, domain);
            let field_errors = match domain {
                DomainError::Validation(fields) => fields.clone(),
                _ => Vec::new(),
            };
            let body = ErrorResponse {
                error: domain.to_string(),
                field_errors,
            };
            (status, Json(body)).into_response()
        }
        None => {
            error!("{}: {:#}", failure, e);
            let body = ErrorResponse {
                error: failure.to_string(),
                field_errors: Vec::new(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
