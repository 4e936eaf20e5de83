//! Domain errors that callers need to tell apart.
//!
//! Services return `anyhow::Result`; when a failure must be distinguishable
//! (for status codes or user-facing messages) it is raised as a `DomainError`
//! and recovered at the boundary with `downcast_ref`.

use shared::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Merchant '{name}' already exists{}", location_suffix(.location))]
    DuplicateMerchant {
        name: String,
        location: Option<String>,
    },

    #[error("Workbook is missing the required sheet '{0}'")]
    MissingSheet(String),

    #[error("Workbook could not be read: {0}")]
    MalformedWorkbook(String),

    #[error("Backup file is not valid: {0}")]
    MalformedBackup(String),

    #[error("No cloud backup found for {0}")]
    BackupNotFound(String),

    #[error("There are no purchases to export")]
    NothingToExport,

    #[error("Cloud backup requires an identity. Please sign in first.")]
    NotSignedIn,

    #[error("Missing access token. Please sign in again to grant file access.")]
    MissingAccessToken,

    #[error("Access token expired. Please sign in again to renew file access.")]
    AccessTokenExpired,

    #[error("Remote store failure: {0}")]
    Remote(String),

    #[error("Remote operation timed out after {0} seconds")]
    RemoteTimeout(u64),

    #[error("Contact form is not configured")]
    ContactNotConfigured,
}

impl DomainError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn location_suffix(location: &Option<String>) -> String {
    match location {
        Some(loc) => format!(" at '{}'", loc),
        None => String::new(),
    }
}

/// Collects per-field validation failures before raising them together
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ok when nothing was collected, otherwise a `DomainError::Validation`
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.push("amount", "must be greater than zero");
        errors.push("merchant_name", "is required");

        let err = errors.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: amount: must be greater than zero; merchant_name: is required"
        );
    }

    #[test]
    fn test_duplicate_merchant_message() {
        let err = DomainError::DuplicateMerchant {
            name: "Café Central".to_string(),
            location: Some("Centro".to_string()),
        };
        assert_eq!(err.to_string(), "Merchant 'Café Central' already exists at 'Centro'");

        let err = DomainError::DuplicateMerchant {
            name: "Café Central".to_string(),
            location: None,
        };
        assert_eq!(err.to_string(), "Merchant 'Café Central' already exists");
    }

    #[test]
    fn test_token_errors_are_distinct() {
        let missing = anyhow::Error::new(DomainError::MissingAccessToken);
        assert!(matches!(
            missing.downcast_ref::<DomainError>(),
            Some(DomainError::MissingAccessToken)
        ));
        assert!(!matches!(
            missing.downcast_ref::<DomainError>(),
            Some(DomainError::AccessTokenExpired)
        ));
    }
}
