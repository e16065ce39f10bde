use thiserror::Error;

/// Error type for the asset streaming runtime.
///
/// "Asset not found anywhere" is deliberately *not* represented here:
/// the resolver reports it through an empty
/// [`crate::ResolveOutcome`] plus a diagnostic log, because a missing
/// asset must never be fatal to the caller.
#[derive(Error, Debug, Clone)]
pub enum AssetStreamError {
    /// A placeholder template required for an asset kind was not
    /// configured. Raised at startup validation, never at resolve time.
    #[error("missing placeholder template: {0}")]
    MissingTemplate(&'static str),

    /// The transport reported an error for an archive. Non-fatal: the
    /// batch containing the affected item stalls until a retry.
    #[error("archive '{archive}' failed to load: {message}")]
    ArchiveLoad {
        /// Archive whose load failed.
        archive: String,
        /// Transport-reported error string.
        message: String,
    },

    /// An archive was queried before any fetch completed for it.
    #[error("archive '{0}' is not downloaded")]
    ArchiveNotDownloaded(String),

    /// Archive index error fallthrough.
    #[error("archive index error: {0}")]
    Index(#[from] std::sync::Arc<cgs_archive_index::Error>),
}

impl From<cgs_archive_index::Error> for AssetStreamError {
    fn from(err: cgs_archive_index::Error) -> Self {
        Self::Index(std::sync::Arc::new(err))
    }
}

/// A result type that can be used to indicate errors.
pub type Result<T, E = AssetStreamError> = std::result::Result<T, E>;
