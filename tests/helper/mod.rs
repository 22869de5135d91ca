//! Shared setup for integration tests

mod registry;
mod upstream;

pub use registry::*;
pub use upstream::*;
