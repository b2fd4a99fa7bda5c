#![forbid(unsafe_code)]

//! Drag and configuration errors.

use fxchain_model::FilterId;

/// Why a gesture could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    /// The view reported no row rectangle (or no panel) for the handle.
    #[error("no geometry available for {0}")]
    GeometryUnavailable(FilterId),
    /// The handle names no filter in the snapshot.
    #[error("cannot drag unknown filter {0}")]
    UnknownFilter(FilterId),
    /// A gesture is already in progress.
    #[error("a drag gesture is already active")]
    AlreadyDragging,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
