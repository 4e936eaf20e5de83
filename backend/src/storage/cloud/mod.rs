//! Cloud persistence: the remote document store abstraction, its in-process
//! implementation and the backend that writes through it.

pub mod cloud_backend;
pub mod document_store;
pub mod memory_store;

pub use cloud_backend::CloudBackend;
pub use document_store::{CollectionPath, DocumentPath, RemoteDocumentStore, StoreError};
pub use memory_store::InMemoryDocumentStore;
