//! End-of-month reminder.
//!
//! `evaluate` decides, purely from the state and the clock, whether a reminder
//! is due. `ReminderService` acts on that decision at most once per calendar
//! month: the month is recorded in the settings (persisted through the active
//! backend) and in an in-memory guard that covers the gap before a cloud echo
//! arrives.
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::domain::models::AppData;
use crate::domain::notifications::NotificationCenter;
use crate::domain::settings_service::SettingsService;
use crate::domain::state::StateManager;
use crate::domain::summary_service::{days_remaining_in_month, summarize};

/// A reminder that should be shown now
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    /// "YYYY-MM"
    pub month: String,
    pub remaining: f64,
    pub days_remaining: u32,
}

impl DueReminder {
    pub fn message(&self) -> String {
        let days = match self.days_remaining {
            0 => "today is the last day of the month".to_string(),
            1 => "1 day left in the month".to_string(),
            n => format!("{} days left in the month", n),
        };
        format!("You still have ${:.2} of your benefit to use: {}.", self.remaining, days)
    }
}

/// Decide whether the reminder is due for `today`
pub fn evaluate(data: &AppData, today: DateTime<Utc>, window_days: u32) -> Option<DueReminder> {
    let settings = &data.settings;
    if !settings.reminders_enabled() {
        return None;
    }

    let month = today.format("%Y-%m").to_string();
    if settings.last_reminder_month.as_deref() == Some(month.as_str()) {
        return None;
    }

    let days_remaining = days_remaining_in_month(today);
    if days_remaining > window_days {
        return None;
    }

    let remaining = summarize(data, today).remaining;
    if remaining <= 0.0 {
        return None;
    }

    Some(DueReminder {
        month,
        remaining,
        days_remaining,
    })
}

#[derive(Clone)]
pub struct ReminderService {
    state: StateManager,
    settings_service: SettingsService,
    notifications: NotificationCenter,
    window_days: u32,
    shown_month: Arc<Mutex<Option<String>>>,
}

impl ReminderService {
    pub fn new(
        state: StateManager,
        settings_service: SettingsService,
        notifications: NotificationCenter,
        window_days: u32,
    ) -> Self {
        Self {
            state,
            settings_service,
            notifications,
            window_days,
            shown_month: Arc::new(Mutex::new(None)),
        }
    }

    /// Show the reminder if it is due. Returns true when a notice was emitted.
    pub async fn check(&self, today: DateTime<Utc>) -> Result<bool> {
        if !self.state.is_ready() {
            return Ok(false);
        }
        let Some(reminder) = evaluate(&self.state.data(), today, self.window_days) else {
            return Ok(false);
        };

        {
            let mut shown = self.shown_month.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if shown.as_deref() == Some(reminder.month.as_str()) {
                debug!("Reminder for {} already shown in this process", reminder.month);
                return Ok(false);
            }
            *shown = Some(reminder.month.clone());
        }

        self.notifications.info(reminder.message());
        info!("⏰ Reminder shown for {} ({:.2} remaining)", reminder.month, reminder.remaining);
        self.settings_service.record_reminder_shown(&reminder.month).await?;
        Ok(true)
    }

    /// Re-evaluate after every state change and on a periodic tick. Checks
    /// run on their own task, after yielding, never inside the caller.
    pub fn spawn_scheduler(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut changes = self.state.changes();
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                tokio::task::yield_now().await;
                if let Err(e) = self.check(Utc::now()).await {
                    warn!("⚠️ Reminder check failed: {}", e);
                }
            }
        })
    }
}
