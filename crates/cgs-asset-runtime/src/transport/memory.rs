use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
    sync::Mutex,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::LoadedArchive;

use super::ArchiveTransport;

/// In-memory transport for tests and local tooling.
///
/// Archives added with [`MemoryTransport::add_archive`] complete as
/// soon as the fetch worker runs; [`MemoryTransport::add_archive_gated`]
/// holds the fetch until [`MemoryTransport::release`], which is how
/// tests stage partial-completion and starvation scenarios. Fetching an
/// unknown archive reports an error string.
#[derive(Default)]
pub struct MemoryTransport {
    archives: Mutex<HashMap<String, LoadedArchive>>,
    gated: Mutex<HashSet<String>>,
    released: Notify,
    fetch_count: AtomicUsize,
}

impl MemoryTransport {
    /// An empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `archive` immediately on fetch.
    pub fn add_archive(&self, archive: LoadedArchive) {
        self.archives
            .lock()
            .unwrap()
            .insert(archive.name.clone(), archive);
    }

    /// Serve `archive` only after [`MemoryTransport::release`] is
    /// called for it.
    pub fn add_archive_gated(&self, archive: LoadedArchive) {
        self.gated.lock().unwrap().insert(archive.name.clone());
        self.add_archive(archive);
    }

    /// Let a gated archive complete.
    pub fn release(&self, name: &str) {
        self.gated.lock().unwrap().remove(name);
        self.released.notify_waiters();
    }

    /// Total number of fetches issued against this transport.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn is_gated(&self, name: &str) -> bool {
        self.gated.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl ArchiveTransport for MemoryTransport {
    async fn fetch(&self, archive: &str) -> Result<LoadedArchive, String> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        loop {
            let released = self.released.notified();
            if !self.is_gated(archive) {
                break;
            }
            released.await;
        }
        self.archives
            .lock()
            .unwrap()
            .get(archive)
            .cloned()
            .ok_or_else(|| format!("archive '{}' not found on server", archive))
    }
}
