//! Benefit settings: partial updates, first-run setup and bookkeeping markers.
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;
use shared::{InitialSetupRequest, UpdateSettingsRequest};

use crate::domain::models::settings::DEFAULT_ALERT_THRESHOLD;
use crate::domain::models::BenefitSettings;
use crate::domain::state::{Mutation, SettingsPatch, StateManager};

#[derive(Clone)]
pub struct SettingsService {
    state: StateManager,
}

impl SettingsService {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    pub fn get_settings(&self) -> BenefitSettings {
        self.state.data().settings
    }

    /// Merge the provided fields into the current settings and store the result.
    ///
    /// Only the given fields are written, so concurrent bookkeeping writes are
    /// never reverted.
    pub async fn update_settings(&self, request: &UpdateSettingsRequest) -> Result<BenefitSettings> {
        let patch = SettingsPatch {
            monthly_allowance: request.monthly_allowance,
            discount_percentage: request.discount_percentage,
            alert_threshold: request.alert_threshold,
            weekly_reminder: request.weekly_reminder,
            end_of_month_reminder: request.end_of_month_reminder,
            ..Default::default()
        };
        let settings = self.commit_patch(patch).await?;
        info!(
            "⚙️ Settings updated: allowance {:.2}, discount {}%, alert {}%",
            settings.monthly_allowance, settings.discount_percentage, settings.alert_threshold
        );
        Ok(settings)
    }

    /// Store the first settings and flag the initial setup as done
    pub async fn complete_initial_setup(&self, request: &InitialSetupRequest) -> Result<BenefitSettings> {
        let patch = SettingsPatch {
            monthly_allowance: Some(request.monthly_allowance),
            discount_percentage: Some(request.discount_percentage),
            alert_threshold: Some(request.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)),
            weekly_reminder: Some(request.weekly_reminder),
            end_of_month_reminder: Some(request.end_of_month_reminder),
            ..Default::default()
        };
        let settings = self.commit_patch(patch).await?;
        self.state.mark_setup_complete()?;
        info!("🎉 Initial setup complete");
        Ok(settings)
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        self.state.is_setup_complete()
    }

    /// Remember that the reminder for `month` ("YYYY-MM") was shown
    pub async fn record_reminder_shown(&self, month: &str) -> Result<()> {
        let patch = SettingsPatch {
            last_reminder_month: Some(month.to_string()),
            ..Default::default()
        };
        self.state.commit(Mutation::UpdateSettings(patch)).await
    }

    pub async fn record_cloud_backup(&self, at: DateTime<Utc>) -> Result<()> {
        let patch = SettingsPatch {
            last_cloud_backup: Some(at),
            ..Default::default()
        };
        self.state.commit(Mutation::UpdateSettings(patch)).await
    }

    /// Validate the patched settings and commit the patch under the session lock
    async fn commit_patch(&self, patch: SettingsPatch) -> Result<BenefitSettings> {
        let mut settings = None;
        self.state
            .commit_with(|current| {
                let patched = patch.applied_to(&current.settings);
                patched.validate()?;
                settings = Some(patched);
                Ok(Some(Mutation::UpdateSettings(patch)))
            })
            .await?;
        Ok(settings.unwrap_or_else(|| self.get_settings()))
    }
}
