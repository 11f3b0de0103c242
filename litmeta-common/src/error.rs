//! Error type shared by the litmeta crates
//!
//! Only configuration loading fails here; everything else in the common
//! crate degrades to defaults.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file exists but could not be read
    #[error("cannot read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the expected sections
    #[error("cannot parse configuration {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },
}
