//! # Local Storage Connection
//!
//! A small key-value store that plays the role of browser local storage: each
//! key is a JSON file in the data directory.
//!
//! ```text
//! data/
//! ├── gastro_tracker_v1_settings.json
//! ├── gastro_tracker_v1_purchases.json
//! ├── gastro_tracker_v1_merchants.json
//! ├── gastro_tracker_v1_setup_complete.json
//! └── gastro_tracker_v1_identity.json
//! ```
//!
//! Writes go to a temp file first and are renamed into place.

use anyhow::Result;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const VALUE_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";

#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_directory: PathBuf,
}

impl LocalStorage {
    /// Open (creating if needed) a local store rooted at `base_directory`
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("📁 Created local storage directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn item_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            || key.starts_with('.')
        {
            return Err(anyhow::anyhow!("Invalid local storage key: '{}'", key));
        }
        Ok(self.base_directory.join(format!("{}.{}", key, VALUE_EXTENSION)))
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path)?;
        debug!("Read local item '{}' ({} bytes)", key, value.len());
        Ok(Some(value))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;

        if !self.base_directory.exists() {
            fs::create_dir_all(&self.base_directory)?;
        }

        let temp_path = path.with_extension(TMP_EXTENSION);
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved local item '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    /// Remove a key. Returns true if it existed.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let path = self.item_path(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed local item '{}'", key);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        assert_eq!(storage.get_item("app_v1_settings").unwrap(), None);
        storage.set_item("app_v1_settings", "{\"a\":1}").unwrap();
        assert_eq!(storage.get_item("app_v1_settings").unwrap().as_deref(), Some("{\"a\":1}"));

        storage.set_item("app_v1_settings", "{\"a\":2}").unwrap();
        assert_eq!(storage.get_item("app_v1_settings").unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(!temp_dir.path().join("app_v1_settings.tmp").exists());

        assert!(storage.remove_item("app_v1_settings").unwrap());
        assert!(!storage.remove_item("app_v1_settings").unwrap());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();

        assert!(storage.set_item("../escape", "x").is_err());
        assert!(storage.set_item("a/b", "x").is_err());
        assert!(storage.get_item("").is_err());
        assert!(storage.get_item(".hidden").is_err());
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");
        let storage = LocalStorage::new(&nested).unwrap();
        storage.set_item("k", "v").unwrap();
        assert!(nested.join("k.json").exists());
    }
}
