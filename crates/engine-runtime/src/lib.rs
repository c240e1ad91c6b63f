pub mod error;
pub mod execution;

pub use execution::{
    executor::{run_transfer, run_with_connectors},
    factory::Endpoints,
};
