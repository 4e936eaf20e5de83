//! Typed access to the namespaced local storage keys.
//!
//! Keys are `{app}_v{schema}_{suffix}` so that a schema bump never reads data
//! written by an older layout.

use anyhow::Result;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::connection::LocalStorage;
use crate::domain::models::{AppData, BenefitSettings, Identity, Merchant, Purchase};

const SETTINGS_KEY: &str = "settings";
const PURCHASES_KEY: &str = "purchases";
const MERCHANTS_KEY: &str = "merchants";
const SETUP_COMPLETE_KEY: &str = "setup_complete";
const IDENTITY_KEY: &str = "identity";

#[derive(Clone, Debug)]
pub struct LocalStateRepository {
    storage: LocalStorage,
    namespace: String,
}

impl LocalStateRepository {
    pub fn new(storage: LocalStorage, app_name: &str, schema_version: u32) -> Self {
        let app: String = app_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        Self {
            storage,
            namespace: format!("{}_v{}", app, schema_version),
        }
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    /// Load the full aggregate. Missing or corrupt entries fall back to defaults.
    pub fn load_data(&self) -> Result<AppData> {
        let settings: BenefitSettings = self.read_json(SETTINGS_KEY)?.unwrap_or_default();
        let purchases: Vec<Purchase> = self.read_json(PURCHASES_KEY)?.unwrap_or_default();
        let merchants: Vec<Merchant> = self.read_json(MERCHANTS_KEY)?.unwrap_or_default();

        info!(
            "📂 Loaded local state: {} purchases, {} merchants",
            purchases.len(),
            merchants.len()
        );

        Ok(AppData {
            settings,
            purchases,
            merchants,
        })
    }

    pub fn save_data(&self, data: &AppData) -> Result<()> {
        self.write_json(SETTINGS_KEY, &data.settings)?;
        self.write_json(PURCHASES_KEY, &data.purchases)?;
        self.write_json(MERCHANTS_KEY, &data.merchants)?;
        Ok(())
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        Ok(self.read_json::<bool>(SETUP_COMPLETE_KEY)?.unwrap_or(false))
    }

    pub fn mark_setup_complete(&self) -> Result<()> {
        self.write_json(SETUP_COMPLETE_KEY, &true)
    }

    pub fn load_identity(&self) -> Result<Option<Identity>> {
        self.read_json(IDENTITY_KEY)
    }

    pub fn save_identity(&self, identity: &Identity) -> Result<()> {
        self.write_json(IDENTITY_KEY, identity)
    }

    pub fn clear_identity(&self) -> Result<()> {
        self.storage.remove_item(&self.key(IDENTITY_KEY))?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, suffix: &str) -> Result<Option<T>> {
        let key = self.key(suffix);
        let Some(raw) = self.storage.get_item(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("⚠️ Ignoring unreadable local item '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, suffix: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.storage.set_item(&self.key(suffix), &json)
    }
}
