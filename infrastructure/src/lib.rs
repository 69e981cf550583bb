mod infra;

pub mod app;
pub mod tracing;

pub use infra::*;
