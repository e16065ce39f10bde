//! Bundle-based asset streaming for a character-generation system.
//!
//! Given a request for a named asset (race, slot, overlay, wardrobe
//! recipe, animator controller) that may not be resident yet, the
//! library:
//!
//! * answers synchronously from the resident caches when it can,
//! * otherwise consults the [`cgs_archive_index::ArchiveIndex`] for the
//!   containing archive, asks the [`ArchiveRegistry`] to fetch it
//!   (never more than one fetch per archive), and hands back a
//!   synthesized placeholder so the caller can proceed without
//!   blocking,
//! * tracks every outstanding placeholder in the [`DownloadLedger`],
//!   grouped into batches by [`RequestContext`],
//! * and, driven by [`AssetLibrary::update`] once per tick, promotes
//!   placeholders to real assets archive by archive: a batch commits
//!   all-or-nothing, and its requester is notified exactly once, so a
//!   consumer never observes a half-upgraded set of assets.
//!
//! The archive transport itself (how bytes actually arrive) is behind
//! the [`ArchiveTransport`] trait; [`transport::MemoryTransport`]
//! serves archives from memory for tests and local tooling.

// crate-specific lint exceptions:
#![warn(missing_docs)]

mod error;
pub use error::{AssetStreamError, Result};

mod asset;
pub use asset::*;

mod placeholder;
pub use placeholder::PlaceholderTemplates;

mod cache;
pub use cache::{AssetDirectory, ResidentCaches};

mod context;
pub use context::{BatchId, RequestContext};

mod requester;
pub use requester::{ChangedCategories, ConsumerRef, Requester};

mod registry;
pub use registry::{create_registry, ArchiveFetchIo, ArchiveRegistry, LoadedArchive};

pub mod transport;
pub use transport::ArchiveTransport;

mod ledger;
pub use ledger::{DownloadLedger, ItemState, PendingDownloadItem};

mod reconciler;
pub use reconciler::BatchReconciler;

mod library;
pub use library::{drive_until_idle, AssetLibrary, AssetLibraryOptions, ResolveOutcome};
