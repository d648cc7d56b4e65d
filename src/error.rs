//! Error types for the label facade and module loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors visible to callers of [`crate::label::Label`].
///
/// Only `show` can fail, and only because no backend could be bound.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label backend unavailable: {0}")]
    BackendUnavailable(#[from] BindError),
}

/// Why a bind attempt failed. Carried for logging, never branched on by callers.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("module could not be resolved: {0}")]
    ModuleNotFound(#[from] LoaderError),

    #[error("entry point '{symbol}' missing from {}", .module.display())]
    MissingEntryPoint { module: PathBuf, symbol: String },

    #[error("entry point in {} returned no interface", .module.display())]
    NullInterface { module: PathBuf },
}

/// Module resolution errors
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("module not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to open {}: {message}", .path.display())]
    Open { path: PathBuf, message: String },

    #[error("invalid module path: {}", .0.display())]
    InvalidPath(PathBuf),
}
