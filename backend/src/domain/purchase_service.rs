//! Purchase operations: create, edit, delete and list.
//!
//! The discount is always computed here from the amount and the current
//! settings percentage; callers never supply it.
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;

use crate::domain::errors::{DomainError, FieldErrors};
use crate::domain::merchant_service::MerchantService;
use crate::domain::models::merchant::normalize_location;
use crate::domain::models::{Purchase, PurchaseDraft};
use crate::domain::state::{Mutation, StateManager};

/// User input for a new or edited purchase
#[derive(Debug, Clone, PartialEq)]
pub struct SavePurchaseCommand {
    pub amount: f64,
    /// Defaults to now
    pub date: Option<DateTime<Utc>>,
    pub merchant_name: String,
    pub merchant_location: Option<String>,
    pub description: Option<String>,
    pub receipt_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavePurchaseResult {
    pub purchase: Purchase,
    pub merchant_created: bool,
}

#[derive(Clone)]
pub struct PurchaseService {
    state: StateManager,
    merchant_service: MerchantService,
}

impl PurchaseService {
    pub fn new(state: StateManager, merchant_service: MerchantService) -> Self {
        Self {
            state,
            merchant_service,
        }
    }

    fn validate(command: &SavePurchaseCommand) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        if !command.amount.is_finite() || command.amount <= 0.0 {
            errors.push("amount", "must be greater than zero");
        }
        if command.merchant_name.trim().is_empty() {
            errors.push("merchant_name", "is required");
        }
        errors.into_result()
    }

    fn to_draft(command: SavePurchaseCommand) -> PurchaseDraft {
        PurchaseDraft {
            amount: command.amount,
            date: command.date.unwrap_or_else(Utc::now),
            merchant_name: command.merchant_name.trim().to_string(),
            merchant_location: normalize_location(command.merchant_location.as_deref()),
            description: command.description.filter(|d| !d.trim().is_empty()),
            receipt_image: command.receipt_image.filter(|r| !r.trim().is_empty()),
        }
    }

    async fn save(&self, id: String, command: SavePurchaseCommand) -> Result<SavePurchaseResult> {
        Self::validate(&command)?;
        let percentage = self.state.data().settings.discount_percentage;
        let purchase = Purchase::from_draft(id, Self::to_draft(command), percentage);

        let merchant_created = self
            .merchant_service
            .ensure_merchant(&purchase.merchant_name, purchase.merchant_location.as_deref())
            .await?;
        self.state.commit(Mutation::UpsertPurchase(purchase.clone())).await?;

        Ok(SavePurchaseResult {
            purchase,
            merchant_created,
        })
    }

    pub async fn add_purchase(&self, command: SavePurchaseCommand) -> Result<SavePurchaseResult> {
        let result = self.save(Purchase::generate_id(), command).await?;
        info!(
            "🧾 Added purchase {}: {:.2} - {:.2} = {:.2}",
            result.purchase.id,
            result.purchase.amount,
            result.purchase.discount_applied,
            result.purchase.final_amount
        );
        Ok(result)
    }

    /// Replace a purchase wholesale, recomputing its discount with the
    /// current settings
    pub async fn update_purchase(&self, id: &str, command: SavePurchaseCommand) -> Result<SavePurchaseResult> {
        if self.state.data().find_purchase(id).is_none() {
            return Err(DomainError::not_found("purchase", id).into());
        }
        let result = self.save(id.to_string(), command).await?;
        info!("✏️ Updated purchase {}", id);
        Ok(result)
    }

    pub async fn delete_purchase(&self, id: &str) -> Result<Purchase> {
        let existing = self
            .state
            .data()
            .find_purchase(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("purchase", id))?;
        self.state.commit(Mutation::DeletePurchase(id.to_string())).await?;
        info!("🗑️ Deleted purchase {}", id);
        Ok(existing)
    }

    /// Purchases, most recent first
    pub fn list_purchases(&self) -> Vec<Purchase> {
        self.state.data().purchases_by_date_desc()
    }
}
