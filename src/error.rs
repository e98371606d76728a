//! Error handling for etfolio
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tracker operations
pub type Result<T> = anyhow::Result<T>;
