#![allow(dead_code)]

pub mod memory;
pub mod utils;

mod live;
mod pipeline;
