//! Phú Long core types and utilities

pub mod error;
pub mod tracing;

pub use error::{CoreError, CoreResult};
