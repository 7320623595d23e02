use std::sync::Arc;

/// Represents a result type for operations in this crate.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// crate-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the event-batching core.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A dispatcher reported that a batch was not delivered. The processor handles this by
    /// keeping the affected events queued for the next flush.
    #[error("event batch dispatch failed: {0}")]
    DispatchFailed(String),

    /// Invalid events endpoint configuration.
    #[error("invalid events endpoint configuration")]
    InvalidEndpoint(#[source] url::ParseError),

    /// Indicates that the event worker thread panicked. This should normally never happen.
    #[error("event worker thread panicked")]
    WorkerPanicked,

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
