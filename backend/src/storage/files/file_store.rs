//! Abstraction over the per-user remote file store (a drive-like service with
//! folders and files) that receives JSON backups.
//!
//! Every call carries the caller's access token; the store decides whether it
//! is still valid.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileStoreError {
    /// Token rejected or expired
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("file store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FileStoreError {
    fn from(e: std::io::Error) -> Self {
        FileStoreError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub modified_at: DateTime<Utc>,
}

#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Id of the folder with this name, if it exists
    async fn find_folder(&self, token: &str, name: &str) -> Result<Option<String>, FileStoreError>;

    async fn create_folder(&self, token: &str, name: &str) -> Result<String, FileStoreError>;

    async fn find_file(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<RemoteFile>, FileStoreError>;

    async fn create_file(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
        content: &[u8],
    ) -> Result<RemoteFile, FileStoreError>;

    /// Replace the content of an existing file
    async fn update_file(&self, token: &str, file_id: &str, content: &[u8]) -> Result<RemoteFile, FileStoreError>;

    async fn download(&self, token: &str, file_id: &str) -> Result<Vec<u8>, FileStoreError>;
}
