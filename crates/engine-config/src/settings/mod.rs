pub mod error;
pub mod strategy;
pub mod validated;

pub use error::SettingsError;
pub use strategy::{FailurePolicy, ReadStrategy};
pub use validated::{TransferSettings, TransferSettingsBuilder};
