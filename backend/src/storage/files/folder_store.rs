//! File store backed by a directory tree, e.g. a locally synced drive.
//!
//! ```text
//! {root}/
//! └── GastroTrackerBackups/
//!     └── gastro_backup_ana_example_com.json
//! ```
//!
//! Folder ids are folder names; file ids are `folder/file` relative paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::file_store::{FileStoreError, RemoteFile, RemoteFileStore};

#[derive(Clone, Debug)]
pub struct FolderFileStore {
    root: PathBuf,
    revoked_tokens: Arc<Mutex<HashSet<String>>>,
}

impl FolderFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, FileStoreError> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!("📁 Created file store root: {}", root.display());
        }
        Ok(Self {
            root,
            revoked_tokens: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject this token on every later call
    pub fn revoke_token(&self, token: &str) {
        if let Ok(mut revoked) = self.revoked_tokens.lock() {
            revoked.insert(token.to_string());
        }
    }

    fn authorize(&self, token: &str) -> Result<(), FileStoreError> {
        if token.trim().is_empty() {
            return Err(FileStoreError::Unauthorized("empty access token".to_string()));
        }
        let revoked = self
            .revoked_tokens
            .lock()
            .map(|r| r.contains(token))
            .unwrap_or(false);
        if revoked {
            return Err(FileStoreError::Unauthorized("access token revoked".to_string()));
        }
        Ok(())
    }

    /// Resolve a relative id under the root, refusing anything that escapes it
    fn resolve(&self, relative: &str) -> Result<PathBuf, FileStoreError> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(FileStoreError::NotFound(relative.to_string()));
        }
        Ok(self.root.join(path))
    }

    fn describe(&self, path: &Path) -> Result<RemoteFile, FileStoreError> {
        let metadata = fs::metadata(path)?;
        let modified_at: DateTime<Utc> = metadata.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        let id = path
            .strip_prefix(&self.root)
            .map_err(|e| FileStoreError::Io(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(RemoteFile { id, name, modified_at })
    }

    fn write_atomically(path: &Path, content: &[u8]) -> Result<(), FileStoreError> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFileStore for FolderFileStore {
    async fn find_folder(&self, token: &str, name: &str) -> Result<Option<String>, FileStoreError> {
        self.authorize(token)?;
        let path = self.resolve(name)?;
        Ok(path.is_dir().then(|| name.to_string()))
    }

    async fn create_folder(&self, token: &str, name: &str) -> Result<String, FileStoreError> {
        self.authorize(token)?;
        let path = self.resolve(name)?;
        fs::create_dir_all(&path)?;
        info!("📁 Created backup folder '{}'", name);
        Ok(name.to_string())
    }

    async fn find_file(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<RemoteFile>, FileStoreError> {
        self.authorize(token)?;
        let path = self.resolve(&format!("{}/{}", folder_id, name))?;
        if !path.is_file() {
            return Ok(None);
        }
        self.describe(&path).map(Some)
    }

    async fn create_file(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
        content: &[u8],
    ) -> Result<RemoteFile, FileStoreError> {
        self.authorize(token)?;
        let folder = self.resolve(folder_id)?;
        if !folder.is_dir() {
            return Err(FileStoreError::NotFound(folder_id.to_string()));
        }
        let path = folder.join(name);
        Self::write_atomically(&path, content)?;
        debug!("Created file '{}' ({} bytes)", path.display(), content.len());
        self.describe(&path)
    }

    async fn update_file(&self, token: &str, file_id: &str, content: &[u8]) -> Result<RemoteFile, FileStoreError> {
        self.authorize(token)?;
        let path = self.resolve(file_id)?;
        if !path.is_file() {
            return Err(FileStoreError::NotFound(file_id.to_string()));
        }
        Self::write_atomically(&path, content)?;
        debug!("Updated file '{}' ({} bytes)", file_id, content.len());
        self.describe(&path)
    }

    async fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, FileStoreError> {
        self.authorize(token)?;
        let path = self.resolve(file_id)?;
        if !path.is_file() {
            return Err(FileStoreError::NotFound(file_id.to_string()));
        }
        Ok(fs::read(&path)?)
    }
}
