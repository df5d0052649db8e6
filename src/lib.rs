#![forbid(unsafe_code)]

//! Public entry point for the TubeKit crate.
//!
//! The library holds the client core (identifier extraction, address state,
//! rendering and the action orchestrator) plus the pieces the backend binary
//! shares with it: wire types, the feed parser and the upstream fetcher.

pub mod address;
pub mod client;
pub mod config;
pub mod ids;
pub mod model;
pub mod orchestrator;
pub mod page;
pub mod render;
pub mod syndication;
pub mod upstream;

/// Installs the `tracing` subscriber used by both binaries. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
