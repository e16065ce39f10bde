use std::sync::Arc;
use std::time::Duration;

use cgs_archive_index::{name_hash, ArchiveIndex, AssetKind};

use tracing::{info, warn};

use crate::{
    create_registry, transport::ArchiveTransport, ArchiveFetchIo, ArchiveRegistry, AssetHandle,
    AssetStreamError, BatchReconciler, DownloadLedger, LoadedArchive, PlaceholderTemplates,
    RequestContext, ResidentCaches, Result,
};

/// What a resolve call handed back.
///
/// Empty means the asset is known to no archive (or is out of scope);
/// that is an answer, not an error. A non-empty outcome holds either
/// the real asset or a placeholder that will be promoted in place.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    /// The resolved assets, placeholders included.
    pub assets: Vec<AssetHandle>,
}

impl ResolveOutcome {
    fn single(asset: AssetHandle) -> Self {
        Self {
            assets: vec![asset],
        }
    }

    /// True when the request resolved to at least one asset.
    pub fn found(&self) -> bool {
        !self.assets.is_empty()
    }
}

/// Builder for [`AssetLibrary`].
pub struct AssetLibraryOptions {
    index: ArchiveIndex,
    templates: Option<PlaceholderTemplates>,
    allow_download: bool,
    search_scope: Option<String>,
}

impl AssetLibraryOptions {
    /// Options over the given archive index, with downloads allowed and
    /// no search scope.
    pub fn new(index: ArchiveIndex) -> Self {
        Self {
            index,
            templates: None,
            allow_download: true,
            search_scope: None,
        }
    }

    /// The placeholder templates. Required.
    #[must_use]
    pub fn with_templates(mut self, templates: PlaceholderTemplates) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Allow or forbid archive downloads. With downloads forbidden the
    /// library only ever answers from resident assets.
    #[must_use]
    pub fn with_downloads_allowed(mut self, allow: bool) -> Self {
        self.allow_download = allow;
        self
    }

    /// Restrict archive lookups to archives whose name contains one of
    /// the comma-separated terms.
    #[must_use]
    pub fn with_search_scope(mut self, scope: impl Into<String>) -> Self {
        self.search_scope = Some(scope.into());
        self
    }

    /// Create the library and the fetch worker it feeds.
    ///
    /// # Errors
    /// Fails if no placeholder templates were provided.
    pub fn create(
        self,
        transport: Arc<dyn ArchiveTransport>,
    ) -> Result<(AssetLibrary, ArchiveFetchIo)> {
        let templates = self
            .templates
            .ok_or(AssetStreamError::MissingTemplate("placeholder templates"))?;
        let (registry, io) = create_registry(transport);
        Ok((
            AssetLibrary {
                index: self.index,
                templates,
                allow_download: self.allow_download,
                search_scope: self.search_scope,
                caches: ResidentCaches::default(),
                registry,
                ledger: DownloadLedger::default(),
                reconciler: BatchReconciler::default(),
            },
            io,
        ))
    }
}

/// The streaming asset library.
///
/// Every resolve call returns synchronously: the real asset when
/// resident, otherwise a placeholder while the containing archive
/// downloads in the background. Drive promotion by calling
/// [`AssetLibrary::update`] once per frame/tick while the paired
/// [`ArchiveFetchIo`] is awaited on the runtime.
pub struct AssetLibrary {
    index: ArchiveIndex,
    templates: PlaceholderTemplates,
    allow_download: bool,
    search_scope: Option<String>,
    caches: ResidentCaches,
    registry: ArchiveRegistry,
    ledger: DownloadLedger,
    reconciler: BatchReconciler,
}

impl AssetLibrary {
    /// Resolve an asset of `kind` by name and/or identity hash.
    ///
    /// At least one of `name` and `hash` must be given; hash-only
    /// lookups work for the hash-identified kinds (races, slots,
    /// overlays).
    pub fn resolve(
        &mut self,
        kind: AssetKind,
        name: Option<&str>,
        hash: Option<i32>,
        ctx: &RequestContext,
    ) -> ResolveOutcome {
        if let Some(resident) = self.caches.lookup(kind, name, hash) {
            return ResolveOutcome::single(AssetHandle::clone(resident));
        }

        let (query_name, archives) = match (name, hash) {
            (Some(name), _) => (name.to_owned(), self.locate(kind, name)),
            (None, Some(hash)) => match self.locate_by_hash(kind, hash) {
                Some(located) => located,
                None => {
                    warn!("no archive contains a {:?} with hash {}", kind, hash);
                    return ResolveOutcome::default();
                }
            },
            (None, None) => {
                warn!("resolve called with neither name nor hash");
                return ResolveOutcome::default();
            }
        };

        let in_scope = self.filter_by_scope(&archives);
        let archive = match in_scope.first() {
            Some(archive) => archive.clone(),
            None => {
                if let Some(elsewhere) = archives.first() {
                    warn!(
                        "'{}' exists in archive '{}', outside the search scope",
                        query_name, elsewhere
                    );
                } else {
                    warn!("no archive contains '{}' ({:?})", query_name, kind);
                }
                return ResolveOutcome::default();
            }
        };

        // Already resident archive: skip the ledger entirely.
        if self.registry.is_downloaded(&archive) {
            if let Ok(loaded) = self.registry.get_loaded(&archive) {
                if let Some(real) = load_with_slot_fallback(&loaded, &query_name, kind) {
                    self.caches.register(AssetHandle::clone(&real));
                    return ResolveOutcome::single(real);
                }
            }
            warn!(
                "'{}' listed in downloaded archive '{}' but not loadable",
                query_name, archive
            );
            return ResolveOutcome::default();
        }

        if !self.allow_download {
            warn!(
                "'{}' needs archive '{}' but downloads are disabled",
                query_name, archive
            );
            return ResolveOutcome::default();
        }

        self.registry.fetch(&archive);
        let hash = hash.unwrap_or_else(|| name_hash(&query_name));
        let placeholder = self.ledger.add_item(
            kind,
            &query_name,
            hash,
            &archive,
            ctx,
            &self.templates,
            &self.index,
        );
        self.caches.register(AssetHandle::clone(&placeholder));
        ResolveOutcome::single(placeholder)
    }

    /// [`AssetLibrary::resolve`], invoking `on_resolved` with the
    /// result set. The callback always fires: with the placeholder
    /// while the asset downloads, with the real asset when resident,
    /// and with the empty set when nothing is found.
    pub fn resolve_with<F>(
        &mut self,
        kind: AssetKind,
        name: Option<&str>,
        hash: Option<i32>,
        ctx: &RequestContext,
        on_resolved: F,
    ) -> ResolveOutcome
    where
        F: FnOnce(&[AssetHandle]),
    {
        let outcome = self.resolve(kind, name, hash, ctx);
        on_resolved(&outcome.assets);
        outcome
    }

    /// Resolve a race by name.
    pub fn get_race(&mut self, name: &str, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Race, Some(name), None, ctx)
    }

    /// Resolve a race by identity hash.
    pub fn get_race_by_hash(&mut self, hash: i32, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Race, None, Some(hash), ctx)
    }

    /// Resolve a slot by name.
    pub fn get_slot(&mut self, name: &str, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Slot, Some(name), None, ctx)
    }

    /// Resolve a slot by identity hash.
    pub fn get_slot_by_hash(&mut self, hash: i32, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Slot, None, Some(hash), ctx)
    }

    /// Resolve an overlay by name.
    pub fn get_overlay(&mut self, name: &str, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Overlay, Some(name), None, ctx)
    }

    /// Resolve an overlay by identity hash.
    pub fn get_overlay_by_hash(&mut self, hash: i32, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::Overlay, None, Some(hash), ctx)
    }

    /// Resolve a recipe by name.
    pub fn get_recipe(&mut self, name: &str, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::WardrobeRecipe, Some(name), None, ctx)
    }

    /// Resolve an animator controller by name.
    pub fn get_animator(&mut self, name: &str, ctx: &RequestContext) -> Option<AssetHandle> {
        self.first(AssetKind::AnimatorController, Some(name), None, ctx)
    }

    fn first(
        &mut self,
        kind: AssetKind,
        name: Option<&str>,
        hash: Option<i32>,
        ctx: &RequestContext,
    ) -> Option<AssetHandle> {
        self.resolve(kind, name, hash, ctx).assets.into_iter().next()
    }

    /// Load and register every asset of `kind` from an already
    /// downloaded archive.
    ///
    /// # Errors
    /// Fails while the archive is not downloaded, or if its download
    /// failed.
    pub fn load_all_of_kind(&mut self, archive: &str, kind: AssetKind) -> Result<Vec<AssetHandle>> {
        let loaded = self.registry.get_loaded(archive)?;
        let mut assets = Vec::new();
        for name in loaded.asset_names_of_kind(kind) {
            if let Some(asset) = loaded.load_asset(name, kind) {
                self.caches.register(AssetHandle::clone(&asset));
                assets.push(asset);
            }
        }
        info!("loaded {} {:?} assets from '{}'", assets.len(), kind, archive);
        Ok(assets)
    }

    /// Start downloading every indexed archive whose name contains one
    /// of the comma-separated terms. Returns how many downloads were
    /// requested.
    pub fn preload_archives(&mut self, terms: &str) -> usize {
        let matched: Vec<String> = self
            .index
            .archive_names()
            .into_iter()
            .filter(|archive| {
                terms
                    .split(',')
                    .map(str::trim)
                    .filter(|term| !term.is_empty())
                    .any(|term| archive.contains(term))
            })
            .map(str::to_owned)
            .collect();
        for archive in &matched {
            self.registry.fetch(archive);
        }
        matched.len()
    }

    /// One streaming tick: absorb finished downloads, then advance
    /// batch promotion.
    pub fn update(&mut self) {
        self.registry.collect_results();
        self.reconciler
            .tick(&mut self.ledger, &self.registry, &mut self.caches);
    }

    /// True when nothing is downloading, pending or waiting to notify.
    pub fn is_idle(&self) -> bool {
        self.ledger.is_empty() && !self.registry.is_downloading(None) && self.reconciler.is_idle()
    }

    /// Coarse download progress of an archive, see
    /// [`ArchiveRegistry::download_progress`].
    pub fn download_progress_of(&self, archive: &str) -> Option<f32> {
        self.registry.download_progress(archive)
    }

    /// The resident caches.
    pub fn caches(&self) -> &ResidentCaches {
        &self.caches
    }

    /// The outstanding-download ledger.
    pub fn ledger(&self) -> &DownloadLedger {
        &self.ledger
    }

    /// The archive index.
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Shut the paired fetch worker down.
    pub fn terminate(&self) {
        self.registry.terminate();
    }

    /// Archives containing `name`, retrying with the `"_Slot"` suffix
    /// for slots requested by semantic name.
    fn locate(&self, kind: AssetKind, name: &str) -> Vec<String> {
        let direct: Vec<String> = self
            .index
            .find_containing_archives(name, kind)
            .into_iter()
            .map(str::to_owned)
            .collect();
        if !direct.is_empty() || kind != AssetKind::Slot {
            return direct;
        }
        self.index
            .find_containing_archives(&format!("{}_Slot", name), kind)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn locate_by_hash(&self, kind: AssetKind, hash: i32) -> Option<(String, Vec<String>)> {
        let mut found_name: Option<String> = None;
        let mut archives = Vec::new();
        for archive in self.index.archive_names() {
            if let Some(name) = self.index.asset_name_from_hash(archive, hash, kind) {
                if found_name.is_none() {
                    found_name = Some(name.to_owned());
                }
                archives.push(archive.to_owned());
            }
        }
        found_name.map(|name| (name, archives))
    }

    fn filter_by_scope(&self, archives: &[String]) -> Vec<String> {
        match &self.search_scope {
            None => archives.to_vec(),
            Some(scope) => archives
                .iter()
                .filter(|archive| {
                    scope
                        .split(',')
                        .map(str::trim)
                        .filter(|term| !term.is_empty())
                        .any(|term| archive.contains(term))
                })
                .cloned()
                .collect(),
        }
    }
}

fn load_with_slot_fallback(
    archive: &LoadedArchive,
    name: &str,
    kind: AssetKind,
) -> Option<AssetHandle> {
    match kind {
        AssetKind::Slot => archive
            .load_asset(name, kind)
            .or_else(|| archive.load_asset(&format!("{}_Slot", name), kind)),
        _ => archive.load_asset(name, kind),
    }
}

/// Drive the library and its fetch worker until idle, polling the
/// worker in `step`-long slices. Intended for tools and tests; a game
/// loop calls [`AssetLibrary::update`] itself.
pub async fn drive_until_idle(library: &mut AssetLibrary, io: &mut ArchiveFetchIo, step: Duration) {
    while !library.is_idle() {
        io.wait(step).await;
        library.update();
    }
}
