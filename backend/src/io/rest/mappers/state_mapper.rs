//! backend/src/io/rest/mappers/state_mapper.rs

use shared::{IdentityInfo, MonthlySummaryResponse, SessionResponse, StateResponse};

use super::{MerchantMapper, PurchaseMapper, SettingsMapper};
use crate::domain::models::Identity;
use crate::domain::state::StateSnapshot;
use crate::domain::summary_service::MonthlySummary;

/// Maps the live state, session and summary views.
pub struct StateMapper;

impl StateMapper {
    pub fn to_state_dto(snapshot: StateSnapshot, setup_complete: bool) -> StateResponse {
        let purchases = snapshot.data.purchases_by_date_desc();
        let merchants = snapshot.data.merchants_by_name();
        StateResponse {
            settings: SettingsMapper::to_dto(snapshot.data.settings),
            purchases: purchases.into_iter().map(PurchaseMapper::to_dto).collect(),
            merchants: merchants.into_iter().map(MerchantMapper::to_dto).collect(),
            mode: snapshot.mode,
            ready: snapshot.ready,
            sync_error: snapshot.sync_error,
            setup_complete,
        }
    }

    pub fn to_session_dto(snapshot: StateSnapshot) -> SessionResponse {
        SessionResponse {
            mode: snapshot.mode,
            identity: snapshot.identity.map(Self::to_identity_dto),
            ready: snapshot.ready,
            sync_error: snapshot.sync_error,
        }
    }

    pub fn to_identity_dto(identity: Identity) -> IdentityInfo {
        IdentityInfo {
            uid: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
        }
    }

    pub fn to_identity(dto: IdentityInfo) -> Identity {
        Identity {
            uid: dto.uid.trim().to_string(),
            email: dto.email.trim().to_string(),
            display_name: dto.display_name,
        }
    }

    pub fn to_summary_dto(summary: MonthlySummary) -> MonthlySummaryResponse {
        MonthlySummaryResponse {
            month: summary.month,
            monthly_allowance: summary.monthly_allowance,
            spent: summary.spent,
            total_discount: summary.total_discount,
            remaining: summary.remaining,
            usage_percentage: summary.usage_percentage,
            alert_threshold: summary.alert_threshold,
            alert_triggered: summary.alert_triggered,
            days_remaining: summary.days_remaining,
            purchase_count: summary.purchase_count,
        }
    }
}
