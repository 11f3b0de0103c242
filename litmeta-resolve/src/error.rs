//! Error types for litmeta-resolve
//!
//! Only configuration-contract violations are errors. Network failures, parse
//! failures, gate rejections and provider policy signals all degrade to "no
//! candidate" inside the engine and never surface here.

use crate::types::Field;
use thiserror::Error;

/// Configuration-contract violation
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A resolvable field has no rule in the field policy
    #[error("No field rule configured for '{0}'")]
    MissingRule(Field),

    /// A gate lexicon pattern does not compile
    #[error("Invalid {list} pattern {pattern:?}: {message}")]
    InvalidPattern {
        list: &'static str,
        pattern: String,
        message: String,
    },

    /// Configuration file could not be loaded
    #[error(transparent)]
    Config(#[from] litmeta_common::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Result type for engine construction and resolution
pub type ResolveResult<T> = Result<T, ResolveError>;
