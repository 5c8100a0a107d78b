//! tailbrain - Tailscale and Docker operations dashboard
//!
//! The dashboard runs inside a container and reaches the host through a
//! small command relay. This crate provides both sides: the relay gateway,
//! the client that talks to it, parsers for the host tools' output, the
//! domain operations built on top, and the compose app registry.

pub mod api;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod ops;
pub mod parsers;
pub mod registry;
pub mod relay;
pub mod types;

pub use client::{CommandRunner, RelayClient};
pub use command::{CommandResult, HostCommand};
pub use config::TailbrainConfig;
pub use error::{Result, TailbrainError};
pub use ops::HostOps;
pub use registry::{ComposeApp, ComposeRegistry};

// Re-export anyhow for the binary edge
pub use anyhow;
