//! The live aggregate: one settings record, purchases and merchants.
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::merchant::Merchant;
use super::purchase::Purchase;
use super::settings::BenefitSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    pub settings: BenefitSettings,
    pub purchases: Vec<Purchase>,
    pub merchants: Vec<Merchant>,
}

impl AppData {
    pub fn find_purchase(&self, id: &str) -> Option<&Purchase> {
        self.purchases.iter().find(|p| p.id == id)
    }

    pub fn find_merchant(&self, name: &str, location: Option<&str>) -> Option<&Merchant> {
        self.merchants.iter().find(|m| m.matches(name, location))
    }

    /// Purchases ordered by date, most recent first
    pub fn purchases_by_date_desc(&self) -> Vec<Purchase> {
        let mut purchases = self.purchases.clone();
        sort_purchases(&mut purchases);
        purchases
    }

    /// Merchants ordered by name, then location
    pub fn merchants_by_name(&self) -> Vec<Merchant> {
        let mut merchants = self.merchants.clone();
        sort_merchants(&mut merchants);
        merchants
    }

    /// Purchases whose date falls in the same calendar month as `reference`
    pub fn purchases_in_month(&self, reference: DateTime<Utc>) -> impl Iterator<Item = &Purchase> {
        let (year, month) = (reference.year(), reference.month());
        self.purchases
            .iter()
            .filter(move |p| p.date.year() == year && p.date.month() == month)
    }
}

pub fn sort_purchases(purchases: &mut [Purchase]) {
    purchases.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

pub fn sort_merchants(merchants: &mut [Merchant]) {
    merchants.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.location.cmp(&b.location))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn purchase(id: &str, day: u32) -> Purchase {
        Purchase {
            id: id.to_string(),
            amount: 100.0,
            date: Utc.with_ymd_and_hms(2025, 5, day, 13, 0, 0).unwrap(),
            merchant_name: "Bar".to_string(),
            merchant_location: None,
            description: None,
            receipt_image: None,
            discount_applied: 15.0,
            final_amount: 85.0,
        }
    }

    #[test]
    fn test_purchases_sorted_most_recent_first() {
        let data = AppData {
            purchases: vec![purchase("a", 3), purchase("b", 20), purchase("c", 11)],
            ..Default::default()
        };
        let ids: Vec<_> = data.purchases_by_date_desc().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_merchants_sorted_by_name() {
        let data = AppData {
            merchants: vec![
                Merchant::new("pizzería", None),
                Merchant::new("Almacén", Some("Sur")),
                Merchant::new("Almacén", Some("Norte")),
            ],
            ..Default::default()
        };
        let names: Vec<_> = data
            .merchants_by_name()
            .into_iter()
            .map(|m| format!("{}/{}", m.name, m.location.unwrap_or_default()))
            .collect();
        assert_eq!(names, vec!["Almacén/Norte", "Almacén/Sur", "pizzería/"]);
    }

    #[test]
    fn test_purchases_in_month() {
        let mut other_month = purchase("x", 1);
        other_month.date = Utc.with_ymd_and_hms(2025, 4, 30, 23, 0, 0).unwrap();
        let data = AppData {
            purchases: vec![purchase("a", 2), other_month],
            ..Default::default()
        };
        let reference = Utc.with_ymd_and_hms(2025, 5, 15, 0, 0, 0).unwrap();
        let ids: Vec<_> = data.purchases_in_month(reference).map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
