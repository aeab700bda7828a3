//! Texweave prelude.

/// Result type in Texweave.
pub type Result<T> = std::result::Result<T, Box<crate::error::Error>>;
