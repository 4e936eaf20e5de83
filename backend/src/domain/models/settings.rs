//! Domain model for the benefit settings singleton.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calculator::{validate_amount, validate_percentage};
use crate::domain::errors::{DomainError, FieldErrors};

pub const DEFAULT_MONTHLY_ALLOWANCE: f64 = 50_000.0;
pub const DEFAULT_DISCOUNT_PERCENTAGE: f64 = 15.0;
pub const DEFAULT_ALERT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BenefitSettings {
    pub monthly_allowance: f64,
    pub discount_percentage: f64,
    pub alert_threshold: f64,
    pub weekly_reminder: bool,
    pub end_of_month_reminder: bool,
    /// "YYYY-MM" of the month whose reminder was already shown
    pub last_reminder_month: Option<String>,
    pub last_local_save: Option<DateTime<Utc>>,
    pub last_cloud_backup: Option<DateTime<Utc>>,
}

impl Default for BenefitSettings {
    fn default() -> Self {
        Self {
            monthly_allowance: DEFAULT_MONTHLY_ALLOWANCE,
            discount_percentage: DEFAULT_DISCOUNT_PERCENTAGE,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            weekly_reminder: false,
            end_of_month_reminder: true,
            last_reminder_month: None,
            last_local_save: None,
            last_cloud_backup: None,
        }
    }
}

impl BenefitSettings {
    pub fn reminders_enabled(&self) -> bool {
        self.weekly_reminder || self.end_of_month_reminder
    }

    /// Check the user-editable fields
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        if validate_amount("monthly_allowance", self.monthly_allowance).is_err() {
            errors.push("monthly_allowance", "must be greater than zero");
        }
        if validate_percentage("discount_percentage", self.discount_percentage).is_err() {
            errors.push("discount_percentage", "must be between 0 and 100");
        }
        if validate_percentage("alert_threshold", self.alert_threshold).is_err() {
            errors.push("alert_threshold", "must be between 0 and 100");
        }
        errors.into_result()
    }
}
