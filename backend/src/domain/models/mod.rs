//! Domain models shared by services and storage backends.

pub mod app_data;
pub mod identity;
pub mod merchant;
pub mod purchase;
pub mod settings;

pub use app_data::AppData;
pub use identity::Identity;
pub use merchant::Merchant;
pub use purchase::{Purchase, PurchaseDraft};
pub use settings::BenefitSettings;
