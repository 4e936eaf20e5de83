pub mod merchant_mapper;
pub mod purchase_mapper;
pub mod settings_mapper;
pub mod state_mapper;

pub use merchant_mapper::MerchantMapper;
pub use purchase_mapper::PurchaseMapper;
pub use settings_mapper::SettingsMapper;
pub use state_mapper::StateMapper;
