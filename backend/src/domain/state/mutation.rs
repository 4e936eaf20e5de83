//! State mutations routed through the active persistence backend.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{AppData, BenefitSettings, Merchant, Purchase};

/// Field-level change to the settings record. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_allowance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_reminder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_month_reminder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reminder_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cloud_backup: Option<DateTime<Utc>>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut BenefitSettings) {
        if let Some(value) = self.monthly_allowance {
            settings.monthly_allowance = value;
        }
        if let Some(value) = self.discount_percentage {
            settings.discount_percentage = value;
        }
        if let Some(value) = self.alert_threshold {
            settings.alert_threshold = value;
        }
        if let Some(value) = self.weekly_reminder {
            settings.weekly_reminder = value;
        }
        if let Some(value) = self.end_of_month_reminder {
            settings.end_of_month_reminder = value;
        }
        if let Some(month) = &self.last_reminder_month {
            settings.last_reminder_month = Some(month.clone());
        }
        if let Some(at) = self.last_cloud_backup {
            settings.last_cloud_backup = Some(at);
        }
    }

    /// `settings` with this patch applied
    pub fn applied_to(&self, settings: &BenefitSettings) -> BenefitSettings {
        let mut patched = settings.clone();
        self.apply(&mut patched);
        patched
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a purchase, or fully replace the one with the same id
    UpsertPurchase(Purchase),
    DeletePurchase(String),
    /// Change only the fields present in the patch
    UpdateSettings(SettingsPatch),
    /// Insert the merchant unless one with the same name and location exists
    EnsureMerchant(Merchant),
    /// Destructive restore: purchases and merchants are replaced, settings kept
    ReplaceCollections {
        purchases: Vec<Purchase>,
        merchants: Vec<Merchant>,
    },
    /// Upsert by id into the existing collections, optionally replacing settings
    MergeBackup {
        purchases: Vec<Purchase>,
        merchants: Vec<Merchant>,
        settings: Option<BenefitSettings>,
    },
}

impl Mutation {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::UpsertPurchase(_) => "upsert_purchase",
            Mutation::DeletePurchase(_) => "delete_purchase",
            Mutation::UpdateSettings(_) => "update_settings",
            Mutation::EnsureMerchant(_) => "ensure_merchant",
            Mutation::ReplaceCollections { .. } => "replace_collections",
            Mutation::MergeBackup { .. } => "merge_backup",
        }
    }

    /// Apply the mutation to an in-memory aggregate
    pub fn apply_to(&self, data: &mut AppData) {
        match self {
            Mutation::UpsertPurchase(purchase) => upsert_by_id(&mut data.purchases, purchase.clone(), |p| &p.id),
            Mutation::DeletePurchase(id) => data.purchases.retain(|p| &p.id != id),
            Mutation::UpdateSettings(patch) => patch.apply(&mut data.settings),
            Mutation::EnsureMerchant(merchant) => {
                if data
                    .find_merchant(&merchant.name, merchant.location.as_deref())
                    .is_none()
                {
                    data.merchants.push(merchant.clone());
                }
            }
            Mutation::ReplaceCollections {
                purchases,
                merchants,
            } => {
                data.purchases = purchases.clone();
                data.merchants = merchants.clone();
            }
            Mutation::MergeBackup {
                purchases,
                merchants,
                settings,
            } => {
                for purchase in purchases {
                    upsert_by_id(&mut data.purchases, purchase.clone(), |p| &p.id);
                }
                for merchant in merchants {
                    upsert_by_id(&mut data.merchants, merchant.clone(), |m| &m.id);
                }
                if let Some(settings) = settings {
                    data.settings = settings.clone();
                }
            }
        }
    }
}

fn upsert_by_id<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &String) {
    match items.iter().position(|existing| id(existing) == id(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn purchase(id: &str, amount: f64) -> Purchase {
        Purchase {
            id: id.to_string(),
            amount,
            date: Utc::now(),
            merchant_name: "Bar".to_string(),
            merchant_location: None,
            description: None,
            receipt_image: None,
            discount_applied: 0.0,
            final_amount: amount,
        }
    }

    #[test]
    fn test_upsert_replaces_whole_purchase() {
        let mut data = AppData::default();
        Mutation::UpsertPurchase(purchase("p1", 10.0)).apply_to(&mut data);
        Mutation::UpsertPurchase(purchase("p1", 25.0)).apply_to(&mut data);

        assert_eq!(data.purchases.len(), 1);
        assert_eq!(data.purchases[0].amount, 25.0);
    }

    #[test]
    fn test_replace_collections_discards_existing() {
        let mut data = AppData::default();
        Mutation::UpsertPurchase(purchase("old", 10.0)).apply_to(&mut data);
        Mutation::EnsureMerchant(Merchant::new("Old", None)).apply_to(&mut data);

        let replace = Mutation::ReplaceCollections {
            purchases: vec![purchase("new", 5.0)],
            merchants: vec![],
        };
        replace.apply_to(&mut data);
        let once = data.clone();
        replace.apply_to(&mut data);

        assert_eq!(data, once);
        assert_eq!(data.purchases.len(), 1);
        assert_eq!(data.purchases[0].id, "new");
        assert!(data.merchants.is_empty());
    }

    #[test]
    fn test_merge_backup_keeps_unrelated_records() {
        let mut data = AppData::default();
        Mutation::UpsertPurchase(purchase("keep", 10.0)).apply_to(&mut data);
        Mutation::UpsertPurchase(purchase("shared", 10.0)).apply_to(&mut data);

        Mutation::MergeBackup {
            purchases: vec![purchase("shared", 99.0), purchase("added", 1.0)],
            merchants: vec![],
            settings: None,
        }
        .apply_to(&mut data);

        assert_eq!(data.purchases.len(), 3);
        assert_eq!(data.find_purchase("shared").unwrap().amount, 99.0);
    }

    #[test]
    fn test_update_settings_touches_only_given_fields() {
        let mut data = AppData::default();
        data.settings.discount_percentage = 30.0;

        let at = Utc::now();
        Mutation::UpdateSettings(SettingsPatch {
            last_cloud_backup: Some(at),
            ..Default::default()
        })
        .apply_to(&mut data);

        assert_eq!(data.settings.discount_percentage, 30.0);
        assert_eq!(data.settings.last_cloud_backup, Some(at));
    }

    #[test]
    fn test_settings_patch_serializes_present_fields_only() {
        let patch = SettingsPatch {
            last_reminder_month: Some("2024-05".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "lastReminderMonth": "2024-05" })
        );
    }

    #[test]
    fn test_ensure_merchant_skips_existing_pair() {
        let mut data = AppData::default();
        Mutation::EnsureMerchant(Merchant::new("Bar Sur", Some("Centro"))).apply_to(&mut data);
        Mutation::EnsureMerchant(Merchant::new(" bar sur ", Some("centro"))).apply_to(&mut data);
        Mutation::EnsureMerchant(Merchant::new("Bar Sur", None)).apply_to(&mut data);

        assert_eq!(data.merchants.len(), 2);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut data = AppData::default();
        Mutation::UpsertPurchase(purchase("p1", 10.0)).apply_to(&mut data);
        Mutation::DeletePurchase("nope".to_string()).apply_to(&mut data);
        assert_eq!(data.purchases.len(), 1);
    }
}
