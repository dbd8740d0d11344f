//! Shared tracing setup for Phú Long clients
//!
//! Library crates only emit events through the `tracing` macros; the host
//! application installs a subscriber once with [`init::init_tracing`].

pub mod config;
pub mod init;

pub use config::InstrumentationConfig;
pub use init::{init_default, init_tracing, try_init_tracing};
