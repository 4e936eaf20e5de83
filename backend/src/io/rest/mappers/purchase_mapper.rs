//! backend/src/io/rest/mappers/purchase_mapper.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use shared::{CreatePurchaseRequest, Purchase as SharedPurchase, PurchaseListResponse};

use crate::domain::errors::DomainError;
use crate::domain::models::Purchase as DomainPurchase;
use crate::domain::purchase_service::SavePurchaseCommand;

/// Mapper between shared Purchase DTOs and domain purchases.
pub struct PurchaseMapper;

impl PurchaseMapper {
    pub fn to_dto(domain: DomainPurchase) -> SharedPurchase {
        SharedPurchase {
            id: domain.id,
            amount: domain.amount,
            date: domain.date.to_rfc3339(),
            merchant_name: domain.merchant_name,
            merchant_location: domain.merchant_location,
            description: domain.description,
            receipt_image: domain.receipt_image,
            discount_applied: domain.discount_applied,
            final_amount: domain.final_amount,
        }
    }

    pub fn to_list_dto(purchases: Vec<DomainPurchase>) -> PurchaseListResponse {
        PurchaseListResponse {
            purchases: purchases.into_iter().map(Self::to_dto).collect(),
        }
    }

    /// Parse a user supplied date: RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD`
    pub fn parse_date(value: &str) -> Result<DateTime<Utc>, DomainError> {
        let value = value.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(value) {
            return Ok(date.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M") {
            return Ok(date.and_utc());
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|d| d.and_utc())
            .ok_or_else(|| DomainError::invalid("date", format!("'{}' is not a valid date", value)))
    }

    pub fn to_command(dto: CreatePurchaseRequest) -> Result<SavePurchaseCommand, DomainError> {
        let date = match dto.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(Self::parse_date(value)?),
        };
        Ok(SavePurchaseCommand {
            amount: dto.amount,
            date,
            merchant_name: dto.merchant_name,
            merchant_location: dto.merchant_location,
            description: dto.description,
            receipt_image: dto.receipt_image,
        })
    }
}
