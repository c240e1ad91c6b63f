pub mod accumulator;
pub mod error;
pub mod orchestrator;
pub mod reader;
pub mod retry;
pub mod transform;
pub mod writer;
