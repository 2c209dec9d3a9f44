//! Error types for the recall core library.

use thiserror::Error;

/// Top-level error type for all recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// A memory with the given ID was not found (association source missing).
    #[error("Memory not found: {0}")]
    NotFound(crate::MemoryId),

    /// Authenticated decryption failed: wrong password, tampered tag or
    /// ciphertext, or a malformed payload field.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The cipher could not be constructed or encryption itself failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Serialization or deserialization failure (e.g. malformed snapshot).
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (unknown compression mode, bad TOML, missing password).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A lossless payload could not be inflated.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RecallError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RecallError>;
