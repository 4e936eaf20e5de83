//! # Domain Layer
//!
//! Business logic of the tracker: discount arithmetic, the live state
//! container and the services the REST layer calls.

pub mod backup_service;
pub mod calculator;
pub mod contact_service;
pub mod errors;
pub mod export_service;
pub mod import_service;
pub mod merchant_service;
pub mod models;
pub mod notifications;
pub mod purchase_service;
pub mod reminder_service;
pub mod settings_service;
pub mod state;
pub mod summary_service;
