//! Logging setup shared by the relay and the dashboard server.

pub mod tracing_setup;

pub use tracing_setup::init_tracing;
