//! Remote file store used for JSON backups.

pub mod file_store;
pub mod folder_store;

pub use file_store::{FileStoreError, RemoteFile, RemoteFileStore};
pub use folder_store::FolderFileStore;
