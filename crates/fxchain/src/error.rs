#![forbid(unsafe_code)]

//! Top-level error type.

use fxchain_drag::{ConfigError, DragError};
use fxchain_model::IdError;

/// Errors surfaced by the facade.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Drag(#[from] DragError),
    #[error(transparent)]
    Id(#[from] IdError),
    /// The global tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Standard result type for fxchain APIs.
pub type Result<T> = std::result::Result<T, Error>;
