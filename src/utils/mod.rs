//! Utility modules

pub mod memory_storage;
pub mod notifier;
pub mod validation;

pub use memory_storage::*;
pub use notifier::*;
pub use validation::*;
