//! # litmeta common library
//!
//! Shared plumbing for the litmeta crates:
//! - Error type
//! - TOML configuration loading and API-key resolution
//! - Tracing initialisation
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
