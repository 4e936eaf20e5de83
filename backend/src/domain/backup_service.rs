//! # Cloud-file backup
//!
//! Serializes the live state into one JSON document per identity and keeps it
//! in an app-owned folder of the user's remote file store:
//!
//! ```text
//! GastroTrackerBackups/
//! └── gastro_backup_ana_example_com.json
//!     { purchases, merchants, settings, metadata: { timestamp, identity, appName, schemaVersion } }
//! ```
//!
//! The access token is checked before any remote call: a missing token and an
//! expired token are distinct errors so the UI can ask for the right thing.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::models::{BenefitSettings, Identity, Merchant, Purchase};
use crate::domain::settings_service::SettingsService;
use crate::domain::state::{Mutation, StateManager};
use crate::storage::files::{FileStoreError, RemoteFile, RemoteFileStore};

pub const BACKUP_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub timestamp: DateTime<Utc>,
    /// Email of the identity that wrote the backup
    pub identity: String,
    pub app_name: String,
    #[serde(default)]
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub purchases: Vec<Purchase>,
    pub merchants: Vec<Merchant>,
    pub settings: BenefitSettings,
    pub metadata: BackupMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupOutcome {
    pub file: RemoteFile,
    pub updated_existing: bool,
    pub timestamp: DateTime<Utc>,
}

/// The three components of a downloaded backup, as JSON text
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredBackup {
    pub purchases_json: String,
    pub merchants_json: String,
    /// `"null"` when the backup carries no settings
    pub settings_json: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedRestore {
    pub purchase_count: usize,
    pub merchant_count: usize,
    pub settings_restored: bool,
}

/// Deterministic backup file name for an identity
pub fn backup_file_name(email: &str) -> String {
    let sanitized: String = email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("gastro_backup_{}.json", sanitized)
}

/// Return the usable token, or the reason it cannot be used
pub fn check_access_token<'a>(
    token: Option<&'a str>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<&'a str, DomainError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DomainError::MissingAccessToken)?;
    if matches!(expires_at, Some(expiry) if expiry <= now) {
        return Err(DomainError::AccessTokenExpired);
    }
    Ok(token)
}

fn component(document: &Value, key: &str, empty: &str) -> Result<String> {
    match document.get(key) {
        Some(Value::Null) | None => Ok(empty.to_string()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}

fn malformed(e: impl std::fmt::Display) -> DomainError {
    DomainError::MalformedBackup(e.to_string())
}

#[derive(Clone)]
pub struct BackupService {
    state: StateManager,
    settings_service: SettingsService,
    file_store: Arc<dyn RemoteFileStore>,
    folder_name: String,
    app_name: String,
    timeout: Duration,
}

impl BackupService {
    pub fn new(
        state: StateManager,
        settings_service: SettingsService,
        file_store: Arc<dyn RemoteFileStore>,
        folder_name: &str,
        app_name: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            state,
            settings_service,
            file_store,
            folder_name: folder_name.to_string(),
            app_name: app_name.to_string(),
            timeout,
        }
    }

    fn require_identity(&self) -> Result<Identity, DomainError> {
        self.state.identity().ok_or(DomainError::NotSignedIn)
    }

    /// Run a file store call under the timeout, mapping its errors
    async fn remote<T>(&self, call: impl Future<Output = Result<T, FileStoreError>>) -> Result<T, DomainError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(FileStoreError::Unauthorized(reason))) => {
                error!("❌ BACKUP: File store rejected the token: {}", reason);
                Err(DomainError::AccessTokenExpired)
            }
            Ok(Err(e)) => Err(DomainError::Remote(e.to_string())),
            Err(_) => Err(DomainError::RemoteTimeout(self.timeout.as_secs())),
        }
    }

    async fn folder_id(&self, token: &str, create: bool) -> Result<Option<String>, DomainError> {
        if let Some(id) = self.remote(self.file_store.find_folder(token, &self.folder_name)).await? {
            return Ok(Some(id));
        }
        if !create {
            return Ok(None);
        }
        Ok(Some(self.remote(self.file_store.create_folder(token, &self.folder_name)).await?))
    }

    /// Write the live state to the identity's backup file, updating it when present
    pub async fn backup_to_cloud(
        &self,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<BackupOutcome> {
        let identity = self.require_identity()?;
        let token = check_access_token(token, expires_at, now)?;

        let data = self.state.data();
        let document = BackupDocument {
            purchases: data.purchases_by_date_desc(),
            merchants: data.merchants_by_name(),
            settings: data.settings.clone(),
            metadata: BackupMetadata {
                timestamp: now,
                identity: identity.email.clone(),
                app_name: self.app_name.clone(),
                schema_version: BACKUP_SCHEMA_VERSION,
            },
        };
        let content = serde_json::to_vec_pretty(&document)?;
        let file_name = backup_file_name(&identity.email);

        let folder_id = self
            .folder_id(token, true)
            .await?
            .ok_or_else(|| DomainError::Remote("backup folder could not be created".to_string()))?;
        let existing = self.remote(self.file_store.find_file(token, &folder_id, &file_name)).await?;

        let (file, updated_existing) = match existing {
            Some(found) => (self.remote(self.file_store.update_file(token, &found.id, &content)).await?, true),
            None => (
                self.remote(self.file_store.create_file(token, &folder_id, &file_name, &content))
                    .await?,
                false,
            ),
        };

        self.settings_service.record_cloud_backup(now).await?;
        info!(
            "☁️ BACKUP: {} '{}' with {} purchases",
            if updated_existing { "Updated" } else { "Created" },
            file.name,
            document.purchases.len()
        );
        Ok(BackupOutcome {
            file,
            updated_existing,
            timestamp: now,
        })
    }

    /// Download the identity's backup and split it into its components
    pub async fn restore_from_cloud(
        &self,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<RestoredBackup> {
        let identity = self.require_identity()?;
        let token = check_access_token(token, expires_at, now)?;
        let file_name = backup_file_name(&identity.email);

        let not_found = || DomainError::BackupNotFound(identity.email.clone());
        let folder_id = self.folder_id(token, false).await?.ok_or_else(not_found)?;
        let file = self
            .remote(self.file_store.find_file(token, &folder_id, &file_name))
            .await?
            .ok_or_else(not_found)?;
        let bytes = self.remote(self.file_store.download(token, &file.id)).await?;

        let document: Value = serde_json::from_slice(&bytes).map_err(malformed)?;
        if !document.is_object() {
            return Err(malformed("backup is not a JSON object").into());
        }
        let schema_version = document
            .pointer("/metadata/schemaVersion")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if schema_version > u64::from(BACKUP_SCHEMA_VERSION) {
            return Err(malformed(format!("backup '{}' is from a newer schema version", file.name)).into());
        }

        info!("☁️ BACKUP: Downloaded '{}' ({} bytes)", file.name, bytes.len());
        Ok(RestoredBackup {
            purchases_json: component(&document, "purchases", "[]")?,
            merchants_json: component(&document, "merchants", "[]")?,
            settings_json: component(&document, "settings", "null")?,
        })
    }

    /// Merge the identity's backup into the live state: purchases and merchants
    /// are upserted by id, settings replaced when present
    pub async fn restore_and_apply(
        &self,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<AppliedRestore> {
        let restored = self.restore_from_cloud(token, expires_at, now).await?;

        let purchases: Vec<Purchase> = serde_json::from_str(&restored.purchases_json).map_err(malformed)?;
        let merchants: Vec<Merchant> = serde_json::from_str(&restored.merchants_json).map_err(malformed)?;
        let settings: Option<BenefitSettings> = serde_json::from_str(&restored.settings_json).map_err(malformed)?;

        let applied = AppliedRestore {
            purchase_count: purchases.len(),
            merchant_count: merchants.len(),
            settings_restored: settings.is_some(),
        };
        self.state
            .commit(Mutation::MergeBackup {
                purchases,
                merchants,
                settings,
            })
            .await?;

        info!(
            "☁️ BACKUP: Restored {} purchases and {} merchants",
            applied.purchase_count, applied.merchant_count
        );
        Ok(applied)
    }
}
