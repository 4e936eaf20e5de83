//! Month-to-date view of the benefit: spent, saved and what is left.
use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::domain::calculator::round2;
use crate::domain::models::AppData;
use crate::domain::state::StateManager;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// "YYYY-MM"
    pub month: String,
    pub monthly_allowance: f64,
    pub spent: f64,
    pub total_discount: f64,
    pub remaining: f64,
    pub usage_percentage: f64,
    pub alert_threshold: f64,
    pub alert_triggered: bool,
    pub days_remaining: u32,
    pub purchase_count: usize,
}

/// Days left in the month of `today`, not counting today
pub fn days_remaining_in_month(today: DateTime<Utc>) -> u32 {
    let (year, month) = (today.year(), today.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last_day = first_of_next
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(today.day());
    last_day.saturating_sub(today.day())
}

/// Compute the summary of the month containing `today`
pub fn summarize(data: &AppData, today: DateTime<Utc>) -> MonthlySummary {
    let settings = &data.settings;
    let (spent, total_discount, purchase_count) = data
        .purchases_in_month(today)
        .fold((0.0, 0.0, 0usize), |(spent, discount, count), p| {
            (spent + p.final_amount, discount + p.discount_applied, count + 1)
        });

    let usage_percentage = if settings.monthly_allowance > 0.0 {
        round2(spent / settings.monthly_allowance * 100.0)
    } else {
        0.0
    };

    MonthlySummary {
        month: today.format("%Y-%m").to_string(),
        monthly_allowance: settings.monthly_allowance,
        spent: round2(spent),
        total_discount: round2(total_discount),
        remaining: round2(settings.monthly_allowance - spent),
        usage_percentage,
        alert_threshold: settings.alert_threshold,
        alert_triggered: usage_percentage >= settings.alert_threshold,
        days_remaining: days_remaining_in_month(today),
        purchase_count,
    }
}

#[derive(Clone)]
pub struct SummaryService {
    state: StateManager,
}

impl SummaryService {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    pub fn monthly_summary(&self, today: DateTime<Utc>) -> MonthlySummary {
        summarize(&self.state.data(), today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Purchase;
    use chrono::TimeZone;

    fn purchase(id: &str, amount: f64, month: u32, day: u32) -> Purchase {
        let mut p = Purchase {
            id: id.to_string(),
            amount,
            date: Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap(),
            merchant_name: "Bar".to_string(),
            merchant_location: None,
            description: None,
            receipt_image: None,
            discount_applied: 0.0,
            final_amount: 0.0,
        };
        let breakdown = crate::domain::calculator::calculate_discount(amount, 15.0);
        p.discount_applied = breakdown.discount_applied;
        p.final_amount = breakdown.final_amount;
        p
    }

    #[test]
    fn test_days_remaining() {
        assert_eq!(days_remaining_in_month(Utc.with_ymd_and_hms(2025, 2, 20, 9, 0, 0).unwrap()), 8);
        assert_eq!(days_remaining_in_month(Utc.with_ymd_and_hms(2024, 2, 20, 9, 0, 0).unwrap()), 9);
        assert_eq!(days_remaining_in_month(Utc.with_ymd_and_hms(2025, 12, 31, 9, 0, 0).unwrap()), 0);
    }

    #[test]
    fn test_summary_only_counts_current_month() {
        let mut data = AppData {
            purchases: vec![
                purchase("a", 20000.0, 5, 3),
                purchase("b", 20000.0, 5, 10),
                purchase("old", 20000.0, 4, 28),
            ],
            ..Default::default()
        };
        data.settings.monthly_allowance = 50000.0;
        data.settings.alert_threshold = 60.0;

        let summary = summarize(&data, Utc.with_ymd_and_hms(2025, 5, 15, 0, 0, 0).unwrap());
        assert_eq!(summary.month, "2025-05");
        assert_eq!(summary.purchase_count, 2);
        assert_eq!(summary.spent, 34000.0);
        assert_eq!(summary.total_discount, 6000.0);
        assert_eq!(summary.remaining, 16000.0);
        assert_eq!(summary.usage_percentage, 68.0);
        assert!(summary.alert_triggered);
        assert_eq!(summary.days_remaining, 16);
    }
}
