//! Error conversion helpers for store and serialization results
//!
//! Provides extension traits for cleaner error handling with key context.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add store key context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// store.set(&key, &bytes)
    ///     .with_key_context("write domain", &key)?;
    /// ```
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Store {
            context: format!("{}: {}", action, key),
            source: e,
        })
    }
}

/// Same as [`IoResultExt`] for JSON encoding and decoding.
pub trait JsonResultExt<T> {
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T>;
}

impl<T> JsonResultExt<T> for serde_json::Result<T> {
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Serialization {
            context: format!("{}: {}", action, key),
            source: e,
        })
    }
}
