use std::{
    collections::HashMap,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use futures::{stream::FuturesUnordered, Future, StreamExt};
use tracing::{error, info, warn};

use cgs_archive_index::AssetKind;

use crate::{Asset, AssetHandle, AssetPayload, AssetStreamError, transport::ArchiveTransport};

/// A fully-downloaded, unpacked archive held resident in memory.
///
/// Archives stay resident for the rest of the session once downloaded:
/// later requests for any asset they contain are answered without
/// another fetch.
#[derive(Debug, Clone, Default)]
pub struct LoadedArchive {
    /// The archive name, as listed in the index.
    pub name: String,
    assets: HashMap<String, AssetPayload>,
}

impl LoadedArchive {
    /// An empty archive with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assets: HashMap::new(),
        }
    }

    /// Add an asset to the archive under its on-disk name.
    pub fn add_asset(&mut self, name: impl Into<String>, payload: AssetPayload) {
        self.assets.insert(name.into(), payload);
    }

    /// True when the archive contains an asset named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    /// Materialize the named asset, checked against the expected kind.
    ///
    /// A name that exists under a different kind is treated as absent;
    /// kinds never alias each other.
    pub fn load_asset(&self, name: &str, kind: AssetKind) -> Option<AssetHandle> {
        let payload = self.assets.get(name)?;
        if payload.kind() != kind {
            return None;
        }
        Some(Asset::real(name, payload.clone()))
    }

    /// On-disk names of every contained asset of `kind`.
    pub fn asset_names_of_kind(&self, kind: AssetKind) -> Vec<&str> {
        self.assets
            .iter()
            .filter(|(_, payload)| payload.kind() == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug)]
enum FetchRequest {
    Fetch(String),
    Terminate,
}

struct FetchResult {
    archive: String,
    outcome: Result<LoadedArchive, String>,
}

enum ArchiveState {
    Downloading,
    Downloaded(Arc<LoadedArchive>),
    Failed(String),
}

/// Create the paired front and back halves of the archive fetcher.
///
/// [`ArchiveRegistry`] is the synchronous front the resolver talks to;
/// [`ArchiveFetchIo`] owns the transport and must be driven on an async
/// runtime via [`ArchiveFetchIo::wait`].
pub fn create_registry(
    transport: Arc<dyn ArchiveTransport>,
) -> (ArchiveRegistry, ArchiveFetchIo) {
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<FetchResult>();
    let (request_tx, request_rx) = tokio::sync::mpsc::unbounded_channel::<FetchRequest>();

    let io = ArchiveFetchIo {
        transport,
        request_rx: Some(request_rx),
        result_tx,
        in_flight: FuturesUnordered::new(),
    };
    let registry = ArchiveRegistry {
        request_tx,
        result_rx,
        archives: HashMap::new(),
    };
    (registry, io)
}

/// Tracks the download state of every archive ever requested.
///
/// Single-owner, mutated only from the update loop. Issues at most one
/// fetch per archive name: repeat requests while a download is in
/// flight, or after it completed, are no-ops. A failed archive may be
/// fetched again by an explicit retry.
pub struct ArchiveRegistry {
    request_tx: tokio::sync::mpsc::UnboundedSender<FetchRequest>,
    result_rx: crossbeam_channel::Receiver<FetchResult>,
    archives: HashMap<String, ArchiveState>,
}

impl ArchiveRegistry {
    /// Request a download of `archive` unless one is already in flight
    /// or already finished.
    pub fn fetch(&mut self, archive: &str) {
        match self.archives.get(archive) {
            Some(ArchiveState::Downloading | ArchiveState::Downloaded(_)) => return,
            Some(ArchiveState::Failed(_)) | None => {}
        }
        self.archives
            .insert(archive.to_owned(), ArchiveState::Downloading);
        if self
            .request_tx
            .send(FetchRequest::Fetch(archive.to_owned()))
            .is_err()
        {
            warn!("fetch worker is gone, '{}' will never download", archive);
        }
    }

    /// Drain finished fetches into the registry state. Returns how many
    /// results were absorbed.
    pub fn collect_results(&mut self) -> usize {
        let mut collected = 0;
        while let Ok(result) = self.result_rx.try_recv() {
            collected += 1;
            match result.outcome {
                Ok(archive) => {
                    info!("archive '{}' downloaded", result.archive);
                    self.archives
                        .insert(result.archive, ArchiveState::Downloaded(Arc::new(archive)));
                }
                Err(message) => {
                    error!("archive '{}' failed to download: {}", result.archive, message);
                    self.archives
                        .insert(result.archive, ArchiveState::Failed(message));
                }
            }
        }
        collected
    }

    /// True when `archive` finished downloading.
    pub fn is_downloaded(&self, archive: &str) -> bool {
        matches!(
            self.archives.get(archive),
            Some(ArchiveState::Downloaded(_))
        )
    }

    /// With a name, true while that archive is in flight; with `None`,
    /// true while any archive is.
    pub fn is_downloading(&self, archive: Option<&str>) -> bool {
        match archive {
            Some(archive) => matches!(self.archives.get(archive), Some(ArchiveState::Downloading)),
            None => self
                .archives
                .values()
                .any(|state| matches!(state, ArchiveState::Downloading)),
        }
    }

    /// The downloaded archive, or why it is unavailable.
    pub fn get_loaded(&self, archive: &str) -> crate::Result<Arc<LoadedArchive>> {
        match self.archives.get(archive) {
            Some(ArchiveState::Downloaded(loaded)) => Ok(Arc::clone(loaded)),
            Some(ArchiveState::Failed(message)) => Err(AssetStreamError::ArchiveLoad {
                archive: archive.to_owned(),
                message: message.clone(),
            }),
            Some(ArchiveState::Downloading) | None => {
                Err(AssetStreamError::ArchiveNotDownloaded(archive.to_owned()))
            }
        }
    }

    /// Coarse progress for UI: 1.0 once downloaded, 0.0 while in
    /// flight, `None` for an archive never requested or failed.
    pub fn download_progress(&self, archive: &str) -> Option<f32> {
        match self.archives.get(archive)? {
            ArchiveState::Downloaded(_) => Some(1.0),
            ArchiveState::Downloading => Some(0.0),
            ArchiveState::Failed(_) => None,
        }
    }

    /// Shut the fetch worker down; in-flight fetches are abandoned.
    pub fn terminate(&self) {
        if self.request_tx.send(FetchRequest::Terminate).is_err() {
            warn!("fetch worker already terminated");
        }
    }
}

type InFlightFetch = Pin<Box<dyn Future<Output = FetchResult> + Send>>;

/// The async back half of the archive fetcher.
///
/// Owns the transport and the in-flight fetch futures. Call
/// [`ArchiveFetchIo::wait`] from the runtime to admit new requests and
/// drive downloads for up to the given duration.
pub struct ArchiveFetchIo {
    transport: Arc<dyn ArchiveTransport>,

    /// Entry point for fetch requests. `None` after termination.
    request_rx: Option<tokio::sync::mpsc::UnboundedReceiver<FetchRequest>>,

    /// Output of finished fetches.
    result_tx: crossbeam_channel::Sender<FetchResult>,

    in_flight: FuturesUnordered<InFlightFetch>,
}

impl ArchiveFetchIo {
    /// Process requests and drive in-flight fetches until `timeout`
    /// elapses. Returns the number of fetches still in flight, or
    /// `None` once terminated.
    pub async fn wait(&mut self, timeout: Duration) -> Option<usize> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut terminated = false;
        loop {
            let request_rx = match self.request_rx.as_mut() {
                None => return None,
                Some(request_rx) => request_rx,
            };
            tokio::select! {
                request = request_rx.recv() => match request {
                    None | Some(FetchRequest::Terminate) => {
                        terminated = true;
                        break;
                    }
                    Some(FetchRequest::Fetch(archive)) => {
                        let transport = Arc::clone(&self.transport);
                        self.in_flight.push(Box::pin(async move {
                            let outcome = transport.fetch(&archive).await;
                            FetchResult { archive, outcome }
                        }));
                    }
                },
                Some(result) = self.in_flight.next() => {
                    if self.result_tx.send(result).is_err() {
                        // Front half dropped, nobody to report to.
                        terminated = true;
                        break;
                    }
                }
                () = tokio::time::sleep_until(deadline) => break,
            }
        }
        if terminated {
            self.request_rx = None;
            return None;
        }
        Some(self.in_flight.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{transport::MemoryTransport, SlotData};

    use super::*;

    fn boots_archive() -> LoadedArchive {
        let mut archive = LoadedArchive::new("clothesA");
        archive.add_asset("Boots_Slot", AssetPayload::Slot(SlotData::new("Boots")));
        archive
    }

    #[tokio::test]
    async fn fetch_then_collect() {
        let transport = Arc::new(MemoryTransport::new());
        transport.add_archive(boots_archive());
        let (mut registry, mut io) = create_registry(transport);

        registry.fetch("clothesA");
        assert!(registry.is_downloading(Some("clothesA")));

        io.wait(Duration::from_millis(100)).await;
        assert_eq!(registry.collect_results(), 1);

        assert!(registry.is_downloaded("clothesA"));
        assert!(!registry.is_downloading(None));
        let loaded = registry.get_loaded("clothesA").unwrap();
        assert!(loaded.load_asset("Boots_Slot", AssetKind::Slot).is_some());
        assert!(loaded.load_asset("Boots_Slot", AssetKind::Overlay).is_none());
        assert_eq!(registry.download_progress("clothesA"), Some(1.0));
    }

    #[tokio::test]
    async fn repeat_fetch_is_single_download() {
        let transport = Arc::new(MemoryTransport::new());
        transport.add_archive(boots_archive());
        let (mut registry, mut io) = create_registry(Arc::clone(&transport) as Arc<dyn ArchiveTransport>);

        registry.fetch("clothesA");
        registry.fetch("clothesA");
        io.wait(Duration::from_millis(100)).await;
        registry.collect_results();
        registry.fetch("clothesA");
        io.wait(Duration::from_millis(10)).await;

        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn missing_archive_fails_and_allows_retry() {
        let transport = Arc::new(MemoryTransport::new());
        let (mut registry, mut io) = create_registry(Arc::clone(&transport) as Arc<dyn ArchiveTransport>);

        registry.fetch("nowhere");
        io.wait(Duration::from_millis(100)).await;
        registry.collect_results();

        assert!(!registry.is_downloaded("nowhere"));
        assert!(matches!(
            registry.get_loaded("nowhere"),
            Err(AssetStreamError::ArchiveLoad { .. })
        ));
        assert_eq!(registry.download_progress("nowhere"), None);

        // The archive shows up later; a retry re-issues the fetch.
        let mut archive = LoadedArchive::new("nowhere");
        archive.add_asset("Boots_Slot", AssetPayload::Slot(SlotData::new("Boots")));
        transport.add_archive(archive);

        registry.fetch("nowhere");
        io.wait(Duration::from_millis(100)).await;
        registry.collect_results();
        assert!(registry.is_downloaded("nowhere"));
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn terminate_stops_the_worker() {
        let transport = Arc::new(MemoryTransport::new());
        let (registry, mut io) = create_registry(transport);

        registry.terminate();
        assert_eq!(io.wait(Duration::from_millis(100)).await, None);
        assert_eq!(io.wait(Duration::from_millis(1)).await, None);
    }

    #[tokio::test]
    async fn gated_archive_stays_in_flight() {
        let transport = Arc::new(MemoryTransport::new());
        transport.add_archive_gated(boots_archive());
        let (mut registry, mut io) = create_registry(Arc::clone(&transport) as Arc<dyn ArchiveTransport>);

        registry.fetch("clothesA");
        let in_flight = io.wait(Duration::from_millis(20)).await;
        assert_eq!(in_flight, Some(1));
        registry.collect_results();
        assert!(registry.is_downloading(Some("clothesA")));

        transport.release("clothesA");
        io.wait(Duration::from_millis(100)).await;
        registry.collect_results();
        assert!(registry.is_downloaded("clothesA"));
    }
}
