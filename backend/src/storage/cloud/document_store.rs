//! # Remote Document Store
//!
//! Abstraction over the per-user document database used in cloud mode.
//!
//! ## Layout
//!
//! ```text
//! users/{uid}/settings/current
//! users/{uid}/purchases/{purchase_id}
//! users/{uid}/merchants/{merchant_id}
//! ```
//!
//! Listeners receive the full, ordered content of a collection every time it
//! changes, starting with the current content right after subscribing.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Path of a collection, e.g. `users/abc/purchases`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Collection owned by a user
    pub fn for_user(uid: &str, collection: &str) -> Self {
        Self(format!("users/{}/{}", uid, collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Owning user id, when the path is under `users/{uid}/`
    pub fn owner(&self) -> Option<&str> {
        let mut parts = self.0.split('/');
        match (parts.next(), parts.next()) {
            (Some("users"), Some(uid)) => Some(uid),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: CollectionPath,
    pub id: String,
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Ordering applied to listener snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// One write of an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Set(DocumentPath, Value),
    /// Overwrite only the top-level fields given, creating the document if needed
    Merge(DocumentPath, Value),
    Delete(DocumentPath),
}

pub type ListenerId = u64;

pub type SnapshotResult = Result<Vec<Document>, StoreError>;

/// Live listener on a collection
pub struct Listener {
    pub id: ListenerId,
    pub updates: mpsc::UnboundedReceiver<SnapshotResult>,
}

#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError>;

    async fn set_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError>;

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError>;

    async fn list_documents(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Apply every operation or none of them
    async fn commit_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Listener, StoreError>;

    /// Stop delivering updates to a listener. Unknown ids are ignored.
    fn unsubscribe(&self, listener: ListenerId);
}
