//! The archive transport boundary.
//!
//! How archive bytes actually arrive (HTTP, on-device catalog, ...) is
//! outside this crate; the core only needs a future per archive. Any
//! retry/backoff policy lives inside the transport; the registry
//! re-issues a fetch only when a caller retries after a reported
//! failure.

use async_trait::async_trait;

use crate::LoadedArchive;

/// Fetches one archive to completion.
#[async_trait]
pub trait ArchiveTransport: Send + Sync {
    /// Download and unpack `archive`.
    ///
    /// # Errors
    /// The transport-reported error string; the core logs it and stalls
    /// the affected batches, it never panics on it.
    async fn fetch(&self, archive: &str) -> Result<LoadedArchive, String>;
}

mod memory;
pub use memory::MemoryTransport;
