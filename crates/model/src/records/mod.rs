pub mod batch;
pub mod normalized;
pub mod raw;
