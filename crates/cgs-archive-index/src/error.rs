use thiserror::Error;

/// An error type for the archive index crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read the index file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The index file is not a valid index document.
    #[error("index deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A result type that can be used to indicate errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;
