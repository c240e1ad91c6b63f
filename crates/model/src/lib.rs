pub mod pagination;
pub mod progress;
pub mod records;
