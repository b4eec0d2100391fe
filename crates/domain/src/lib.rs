//! Shared types for the Recurra crates: error type, TOML configuration and
//! structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
