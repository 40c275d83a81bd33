//! Typed error taxonomy for the fetch pipeline.
//!
//! Adapter internals work in `anyhow::Result`/`.context(...)`; each adapter
//! method maps to one of the kinds below at the point it crosses the public
//! `StoreAdapter` boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("prefix not found: {0}")]
    NotFoundPrefix(String),

    #[error("object not found: {path} (version {version:?})")]
    NotFoundObject { path: String, version: String },

    #[error("credentials missing: {0}")]
    AuthMissing(String),

    #[error("credentials rejected: {0}")]
    AuthRejected(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// Cooperative cancellation. Never constructed by an adapter and never
    /// surfaces across the public `iter_files`/`iter_pointers` API — the
    /// bridge and pipeline use it internally to stop a drained iteration
    /// without turning it into a consumer-visible error.
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
