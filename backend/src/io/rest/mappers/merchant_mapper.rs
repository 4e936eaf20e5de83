//! backend/src/io/rest/mappers/merchant_mapper.rs

use shared::{Merchant as SharedMerchant, MerchantListResponse};

use crate::domain::models::Merchant as DomainMerchant;

pub struct MerchantMapper;

impl MerchantMapper {
    pub fn to_dto(domain: DomainMerchant) -> SharedMerchant {
        SharedMerchant {
            id: domain.id,
            name: domain.name,
            location: domain.location,
        }
    }

    pub fn to_list_dto(merchants: Vec<DomainMerchant>) -> MerchantListResponse {
        MerchantListResponse {
            merchants: merchants.into_iter().map(Self::to_dto).collect(),
        }
    }
}
