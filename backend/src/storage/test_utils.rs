/// Test utilities with automatic cleanup
///
/// The temporary directory lives as long as the environment, so test data is
/// removed even when a test panics.
use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

use super::local::{LocalStateRepository, LocalStorage};

pub const TEST_APP_NAME: &str = "gastro_tracker";
pub const TEST_SCHEMA_VERSION: u32 = 1;

pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub storage: LocalStorage,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        let storage = LocalStorage::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            storage,
            base_path,
        })
    }

    /// Repository over this environment's storage with the default namespace
    pub fn repository(&self) -> LocalStateRepository {
        LocalStateRepository::new(self.storage.clone(), TEST_APP_NAME, TEST_SCHEMA_VERSION)
    }
}
