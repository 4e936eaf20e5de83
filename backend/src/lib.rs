//! # Gastro Tracker Backend
//!
//! Tracks spending against a monthly gastronomic benefit: purchases,
//! merchants, the discount each purchase earned and how much allowance is
//! left. The live state is kept either in local files or in a remote document
//! store once the user signs in.
//!
//! ## Architecture
//!
//! ```text
//! REST (io::rest)          handlers, DTO mappers, error translation
//!     ↓
//! Domain (domain)          services, calculator, state manager, reminders
//!     ↓
//! Storage (storage)        local files, remote documents, remote files
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::domain::backup_service::BackupService;
use crate::domain::contact_service::ContactService;
use crate::domain::export_service::ExportService;
use crate::domain::import_service::ImportService;
use crate::domain::merchant_service::MerchantService;
use crate::domain::notifications::NotificationCenter;
use crate::domain::purchase_service::PurchaseService;
use crate::domain::reminder_service::ReminderService;
use crate::domain::settings_service::SettingsService;
use crate::domain::state::StateManager;
use crate::domain::summary_service::SummaryService;
use crate::storage::cloud::{InMemoryDocumentStore, RemoteDocumentStore};
use crate::storage::files::{FolderFileStore, RemoteFileStore};
use crate::storage::local::{LocalStateRepository, LocalStorage};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub state_manager: StateManager,
    pub purchase_service: PurchaseService,
    pub merchant_service: MerchantService,
    pub settings_service: SettingsService,
    pub summary_service: SummaryService,
    pub reminder_service: ReminderService,
    pub export_service: ExportService,
    pub import_service: ImportService,
    pub backup_service: BackupService,
    pub contact_service: ContactService,
    pub notifications: NotificationCenter,
}

/// Wire every service over the given stores. No session is attached yet.
pub fn build_app_state(
    config: &AppConfig,
    remote_store: Arc<dyn RemoteDocumentStore>,
    file_store: Arc<dyn RemoteFileStore>,
) -> Result<AppState> {
    info!("Setting up local storage in {}", config.data_directory.display());
    let storage = LocalStorage::new(&config.data_directory)?;
    let repository = LocalStateRepository::new(storage, &config.app_name, config.schema_version);

    info!("Setting up domain model");
    let notifications = NotificationCenter::new();
    let state_manager = StateManager::new(
        repository,
        remote_store,
        notifications.clone(),
        config.remote_timeout(),
    );
    let settings_service = SettingsService::new(state_manager.clone());
    let merchant_service = MerchantService::new(state_manager.clone());
    let purchase_service = PurchaseService::new(state_manager.clone(), merchant_service.clone());
    let summary_service = SummaryService::new(state_manager.clone());
    let reminder_service = ReminderService::new(
        state_manager.clone(),
        settings_service.clone(),
        notifications.clone(),
        config.reminders.window_days,
    );
    let export_service = ExportService::new(state_manager.clone(), settings_service.clone(), notifications.clone());
    let import_service = ImportService::new(state_manager.clone());
    let backup_service = BackupService::new(
        state_manager.clone(),
        settings_service.clone(),
        file_store,
        &config.cloud_backup.folder_name,
        &config.app_name,
        config.remote_timeout(),
    );
    let contact_service = ContactService::new(config.contact.clone());
    if !contact_service.is_configured() {
        info!("Contact form disabled: no SMTP settings in the configuration");
    }

    Ok(AppState {
        state_manager,
        purchase_service,
        merchant_service,
        settings_service,
        summary_service,
        reminder_service,
        export_service,
        import_service,
        backup_service,
        contact_service,
        notifications,
    })
}

/// Initialize the backend with all required services and restore the last session
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    let remote_store: Arc<dyn RemoteDocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let file_store: Arc<dyn RemoteFileStore> = Arc::new(FolderFileStore::new(config.file_store_root())?);

    let app_state = build_app_state(config, remote_store, file_store)?;

    info!("Restoring session");
    if let Err(e) = app_state.state_manager.restore_session().await {
        warn!("⚠️ Session could not be restored, continuing with empty state: {:#}", e);
    }
    Ok(app_state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    // CORS setup to allow the frontend dev server to make requests
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("http://localhost:8080"))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api", io::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
