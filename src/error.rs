//! Error types for ChatMem
//!
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Contract violations — such as calling [`crate::store::MessageStore::replace_span`]
//! with an out-of-range or protected index — are bugs in the caller, not
//! recoverable conditions, and panic instead of returning an error.

use thiserror::Error;

/// The primary error type for ChatMem operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Configuration-related errors (non-positive token budget, trigger ratio
    /// outside (0, 1], etc.). Raised at construction; fatal, not retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors (knowledge-file loading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for ChatMem operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
