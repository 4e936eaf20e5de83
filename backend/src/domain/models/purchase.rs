//! Domain model for a purchase made with the benefit card.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calculator::{calculate_discount, DiscountBreakdown};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub merchant_name: String,
    #[serde(default)]
    pub merchant_location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_image: Option<String>,
    pub discount_applied: f64,
    pub final_amount: f64,
}

/// Purchase fields supplied by the user, before the discount is computed
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseDraft {
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub merchant_name: String,
    pub merchant_location: Option<String>,
    pub description: Option<String>,
    pub receipt_image: Option<String>,
}

impl Purchase {
    /// Generate a purchase ID
    pub fn generate_id() -> String {
        format!("purchase::{}", uuid::Uuid::new_v4())
    }

    /// Build a purchase from a draft, computing the discount with the given percentage
    pub fn from_draft(id: String, draft: PurchaseDraft, discount_percentage: f64) -> Self {
        let DiscountBreakdown {
            discount_applied,
            final_amount,
        } = calculate_discount(draft.amount, discount_percentage);

        Self {
            id,
            amount: draft.amount,
            date: draft.date,
            merchant_name: draft.merchant_name,
            merchant_location: draft.merchant_location,
            description: draft.description,
            receipt_image: draft.receipt_image,
            discount_applied,
            final_amount,
        }
    }

    /// Month key ("YYYY-MM") of the purchase date
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}
