pub mod cloud;
pub mod files;
pub mod local;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use traits::*;
