use serde::{Deserialize, Serialize};
use std::fmt;

/// Purchase ID in format: "purchase::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    /// Original amount paid before the benefit discount
    pub amount: f64,
    /// Purchase timestamp (RFC 3339)
    pub date: String,
    pub merchant_name: String,
    pub merchant_location: Option<String>,
    pub description: Option<String>,
    /// Reference to a stored receipt image, if any
    pub receipt_image: Option<String>,
    /// Discount granted by the benefit (rounded to cents)
    pub discount_applied: f64,
    /// Amount charged against the allowance (amount - discount, rounded to cents)
    pub final_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
}

/// Benefit configuration. Exactly one exists per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitSettings {
    pub monthly_allowance: f64,
    /// Discount percentage granted on each purchase (0-100)
    pub discount_percentage: f64,
    /// Usage percentage of the allowance that triggers an alert (0-100)
    pub alert_threshold: f64,
    pub weekly_reminder: bool,
    pub end_of_month_reminder: bool,
    /// Month ("YYYY-MM") in which the last reminder was shown
    pub last_reminder_month: Option<String>,
    /// RFC 3339 timestamp of the last local save
    pub last_local_save: Option<String>,
    /// RFC 3339 timestamp of the last backup (workbook or cloud file)
    pub last_cloud_backup: Option<String>,
}

/// Where the live state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceMode {
    /// No identity present, state lives in local storage
    Local,
    /// Identity present, state mirrors the remote document store
    Cloud,
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceMode::Local => write!(f, "local"),
            PersistenceMode::Cloud => write!(f, "cloud"),
        }
    }
}

/// Full view of the live state as seen by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub settings: BenefitSettings,
    /// Purchases sorted by date descending
    pub purchases: Vec<Purchase>,
    /// Merchants sorted by name ascending
    pub merchants: Vec<Merchant>,
    pub mode: PersistenceMode,
    /// False while cloud subscriptions have not reported back yet
    pub ready: bool,
    /// Persistent sync error, if the live subscription failed
    pub sync_error: Option<String>,
    pub setup_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePurchaseRequest {
    pub amount: f64,
    /// Optional date override (RFC 3339 or YYYY-MM-DD) - uses current time if not provided
    pub date: Option<String>,
    pub merchant_name: String,
    pub merchant_location: Option<String>,
    pub description: Option<String>,
    pub receipt_image: Option<String>,
}

/// Full replacement of an existing purchase
pub type UpdatePurchaseRequest = CreatePurchaseRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub purchase: Purchase,
    /// True when the purchase introduced a new (name, location) merchant
    pub merchant_created: bool,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePurchaseResponse {
    pub deleted_id: String,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseListResponse {
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMerchantRequest {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantResponse {
    pub merchant: Merchant,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantListResponse {
    pub merchants: Vec<Merchant>,
}

/// Partial settings update. Missing fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub monthly_allowance: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub alert_threshold: Option<f64>,
    pub weekly_reminder: Option<bool>,
    pub end_of_month_reminder: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSetupRequest {
    pub monthly_allowance: f64,
    pub discount_percentage: f64,
    pub alert_threshold: Option<f64>,
    pub weekly_reminder: bool,
    pub end_of_month_reminder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub settings: BenefitSettings,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummaryResponse {
    /// Month in "YYYY-MM" format
    pub month: String,
    pub monthly_allowance: f64,
    /// Sum of final amounts of this month's purchases
    pub spent: f64,
    pub total_discount: f64,
    pub remaining: f64,
    pub usage_percentage: f64,
    pub alert_threshold: f64,
    pub alert_triggered: bool,
    pub days_remaining: u32,
    pub purchase_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub type SignInRequest = IdentityInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub mode: PersistenceMode,
    pub identity: Option<IdentityInfo>,
    pub ready: bool,
    pub sync_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub sheet: String,
    /// 1-based spreadsheet row number
    pub row: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreWorkbookResponse {
    pub purchase_count: usize,
    pub merchant_count: usize,
    pub warnings: Vec<ImportWarning>,
    pub success_message: String,
}

/// OAuth grant used for cloud-file backup operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudBackupRequest {
    pub access_token: Option<String>,
    /// RFC 3339 expiry of the access token
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudBackupResponse {
    pub file_id: String,
    pub file_name: String,
    /// True when an existing backup file was overwritten
    pub updated_existing: bool,
    pub timestamp: String,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudRestoreResponse {
    pub purchase_count: usize,
    pub merchant_count: usize,
    pub settings_restored: bool,
    pub success_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible notification (toast)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    /// Persistent notices stay until the condition clears; others auto-dismiss
    pub persistent: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error body returned by every failing API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_mode_display() {
        assert_eq!(PersistenceMode::Local.to_string(), "local");
        assert_eq!(PersistenceMode::Cloud.to_string(), "cloud");
    }

    #[test]
    fn test_error_response_omits_empty_field_errors() {
        let body = ErrorResponse {
            error: "Something failed".to_string(),
            field_errors: Vec::new(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("field_errors"));

        let parsed: ErrorResponse = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert!(parsed.field_errors.is_empty());
    }
}
