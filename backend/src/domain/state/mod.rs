//! Live state container and the mutations it accepts.

pub mod mutation;
pub mod state_manager;

pub use mutation::{Mutation, SettingsPatch};
pub use state_manager::{StateManager, StateSnapshot};
