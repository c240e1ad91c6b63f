pub mod adapter;
pub mod destination;
pub mod source;
pub(crate) mod utils;
