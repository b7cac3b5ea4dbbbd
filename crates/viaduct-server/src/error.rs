//! Server error types.

use thiserror::Error;

/// Errors raised while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be parsed or bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// An I/O error occurred in the accept loop.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
