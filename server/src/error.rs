//! Error types for the tag server
//!
//! Nothing here is fatal to the process: callers log these and keep the
//! refresh loop alive.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TagError>;

#[derive(Debug, Error)]
pub enum TagError {
    /// File system error while reading or writing tag data
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Tag data could not be encoded or decoded
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration file is unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad command or API arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No connected player matches '{0}'")]
    UnknownPlayer(String),

    #[error("Rainbow palette is empty")]
    EmptyPalette,

    /// Stored record violates an invariant the engine relies on
    #[error("Malformed tag record: {0}")]
    MalformedRecord(String),

    /// Permanent tags changed in memory but could not be written out
    #[error("Failed to persist tags: {0}")]
    Persist(String),
}
