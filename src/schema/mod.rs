//! Schema module - Configuration, genome and result types for game training.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
