pub mod adapter;
pub mod destination;
pub mod error;
pub mod source;
pub mod sql;
pub mod stream;
