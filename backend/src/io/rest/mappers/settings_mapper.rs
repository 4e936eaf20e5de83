//! backend/src/io/rest/mappers/settings_mapper.rs

use shared::BenefitSettings as SharedSettings;

use crate::domain::models::BenefitSettings as DomainSettings;

pub struct SettingsMapper;

impl SettingsMapper {
    pub fn to_dto(domain: DomainSettings) -> SharedSettings {
        SharedSettings {
            monthly_allowance: domain.monthly_allowance,
            discount_percentage: domain.discount_percentage,
            alert_threshold: domain.alert_threshold,
            weekly_reminder: domain.weekly_reminder,
            end_of_month_reminder: domain.end_of_month_reminder,
            last_reminder_month: domain.last_reminder_month,
            last_local_save: domain.last_local_save.map(|d| d.to_rfc3339()),
            last_cloud_backup: domain.last_cloud_backup.map(|d| d.to_rfc3339()),
        }
    }
}
