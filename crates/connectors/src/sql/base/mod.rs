pub mod dialect;
pub mod query;
pub mod table;
