//! Registration-time configuration errors.
//!
//! These are raised synchronously by `build()` before any route exists,
//! so they never reach an HTTP client. Callers are expected to treat
//! them as fatal to that registration attempt.

use thiserror::Error;

/// A pipeline was built with an incomplete configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `build()` was called before `.path(...)` bound a route path.
    #[error("path is required")]
    MissingPath,

    /// `build()` was called before a verb method bound the terminal stage.
    #[error("a route verb and terminal stage are required")]
    MissingRoute,
}
