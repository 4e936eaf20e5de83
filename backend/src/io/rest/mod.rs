//! # REST API Interface Layer
//!
//! HTTP endpoints for the tracker, all nested under `/api`:
//!
//! - `GET /state`, `GET /summary`, `GET /notifications`
//! - `GET|PUT /settings`, `POST /setup`
//! - `GET|POST /purchases`, `PUT|DELETE /purchases/:id`
//! - `GET|POST /merchants`
//! - `GET /session`, `POST /session/sign-in`, `POST /session/sign-out`
//! - `GET /export/csv`, `GET /export/workbook`, `POST /import/workbook`
//! - `POST /backup/cloud`, `POST /backup/cloud/restore`
//! - `POST /contact`
//!
//! Handlers only translate: DTOs in, domain calls, DTOs out. Failures go
//! through [`error_mapping::error_response`] so every error body has the
//! same `ErrorResponse` shape.

pub mod backup_apis;
pub mod contact_apis;
pub mod error_mapping;
pub mod export_apis;
pub mod mappers;
pub mod merchant_apis;
pub mod purchase_apis;
pub mod session_apis;
pub mod settings_apis;
pub mod state_apis;

use axum::Router;

use crate::AppState;

/// All API routes, relative to `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(state_apis::router())
        .merge(settings_apis::router())
        .merge(export_apis::router())
        .nest("/purchases", purchase_apis::router())
        .nest("/merchants", merchant_apis::router())
        .nest("/session", session_apis::router())
        .nest("/backup", backup_apis::router())
        .nest("/contact", contact_apis::router())
}
