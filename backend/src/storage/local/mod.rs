//! Local-only persistence: a file-backed key-value store and the backend on top of it.

pub mod connection;
pub mod local_backend;
pub mod local_repository;

pub use connection::LocalStorage;
pub use local_backend::LocalBackend;
pub use local_repository::LocalStateRepository;
