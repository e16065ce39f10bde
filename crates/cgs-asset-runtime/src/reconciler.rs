use std::collections::HashSet;
use std::sync::Weak;

use cgs_archive_index::AssetKind;

use tracing::{error, info, warn};

use crate::{
    ArchiveRegistry, BatchId, ChangedCategories, ConsumerRef, DownloadLedger, ItemState,
    PendingDownloadItem, ResidentCaches,
};

/// Promotes finished batches from placeholder to real assets.
///
/// A batch promotes only when every one of its archives has been
/// observed downloaded on an *earlier* tick, and then promotes whole:
/// a consumer never sees a mix of placeholder and real assets from the
/// same batch. Requester notifications are accumulated across batches
/// and delivered once the ledger drains completely.
#[derive(Default)]
pub struct BatchReconciler {
    pending_notifications: Vec<(ConsumerRef, ChangedCategories)>,
}

impl BatchReconciler {
    /// Advance every batch one step. Call once per update tick, after
    /// the registry collected its results.
    pub fn tick(
        &mut self,
        ledger: &mut DownloadLedger,
        registry: &ArchiveRegistry,
        caches: &mut ResidentCaches,
    ) {
        // Archives confirmed downloaded during this tick; an archive
        // that flips to downloaded mid-iteration must not make later
        // batches promote a tick early.
        let mut finished: HashSet<String> = HashSet::new();
        let mut promotable: Vec<BatchId> = Vec::new();

        for batch_id in ledger.batch_ids() {
            let mut can_promote = true;
            for item in ledger
                .items_mut()
                .iter_mut()
                .filter(|item| item.batch_id == batch_id)
            {
                let downloaded = finished.contains(&item.containing_archive)
                    || registry.is_downloaded(&item.containing_archive);
                if !downloaded {
                    can_promote = false;
                    continue;
                }
                finished.insert(item.containing_archive.clone());
                if item.state == ItemState::Pending {
                    item.state = ItemState::ArchiveReady;
                    can_promote = false;
                }
            }
            if can_promote {
                promotable.push(batch_id);
            }
        }

        for batch_id in promotable {
            self.promote_batch(batch_id, ledger, registry, caches);
        }

        if ledger.is_empty() {
            self.flush_notifications();
        }
    }

    /// True when no notification is still waiting on the ledger.
    pub fn is_idle(&self) -> bool {
        self.pending_notifications.is_empty()
    }

    fn promote_batch(
        &mut self,
        batch_id: BatchId,
        ledger: &mut DownloadLedger,
        registry: &ArchiveRegistry,
        caches: &mut ResidentCaches,
    ) {
        // Everything must be loadable before anything installs.
        for item in ledger.items_in_batch(batch_id) {
            if let Err(err) = registry.get_loaded(&item.containing_archive) {
                error!("batch {} cannot promote: {}", batch_id, err);
                return;
            }
        }

        let items = ledger.take_batch(batch_id);
        info!("promoting batch {} ({} items)", batch_id, items.len());
        for item in items {
            self.promote_item(&item, registry, caches);
        }
    }

    fn promote_item(
        &mut self,
        item: &PendingDownloadItem,
        registry: &ArchiveRegistry,
        caches: &mut ResidentCaches,
    ) {
        let archive = match registry.get_loaded(&item.containing_archive) {
            Ok(archive) => archive,
            Err(err) => {
                error!("'{}' lost its archive at promotion: {}", item.required_name, err);
                return;
            }
        };

        // Slots commonly live on disk under the "_Slot" suffix.
        let real = match item.kind {
            AssetKind::Slot => archive.load_asset(&item.required_name, item.kind).or_else(|| {
                archive.load_asset(&format!("{}_Slot", item.required_name), item.kind)
            }),
            _ => archive.load_asset(&item.required_name, item.kind),
        };
        let real = match real {
            Some(real) => real,
            None => {
                error!(
                    "'{}' ({:?}) missing from downloaded archive '{}'",
                    item.required_name, item.kind, item.containing_archive
                );
                return;
            }
        };

        // The placeholder may sit in the cache under requested keys
        // (e.g. the on-disk name's hash) that the real asset's identity
        // keys do not cover; drop all of them before installing.
        caches.directory_mut(item.kind).forget(&item.placeholder);

        let requester = match &item.requester {
            Some(weak) => match weak.upgrade() {
                Some(requester) => Some(requester),
                None => {
                    warn!(
                        "requester of '{}' is gone, skipping its updates",
                        item.required_name
                    );
                    None
                }
            },
            None => None,
        };

        let mut changed = ChangedCategories::default();
        match item.kind {
            AssetKind::Race => {
                caches.register(real.clone());
                if let Some(requester) = &requester {
                    requester.set_active_race(&real);
                }
                changed.race = true;
            }
            AssetKind::Slot => {
                caches.register(real);
                changed.slots = true;
            }
            AssetKind::Overlay => {
                caches.register(real);
                changed.overlays = true;
            }
            AssetKind::WardrobeRecipe => {
                // Recipes are requester-scoped, never installed globally.
                if let Some(requester) = &requester {
                    requester.add_recipe(&real);
                }
                changed.recipes = true;
            }
            AssetKind::AnimatorController => {
                if let Some(requester) = &requester {
                    requester.set_animator(&real);
                }
            }
            AssetKind::Other => {
                caches.register(real);
            }
        }

        if let Some(weak) = &item.requester {
            if requester.is_some() {
                self.note_change(weak, changed);
            }
        }
    }

    fn note_change(&mut self, requester: &ConsumerRef, changed: ChangedCategories) {
        for (existing, merged) in &mut self.pending_notifications {
            if Weak::ptr_eq(existing, requester) {
                merged.merge(changed);
                return;
            }
        }
        self.pending_notifications
            .push((ConsumerRef::clone(requester), changed));
    }

    fn flush_notifications(&mut self) {
        for (weak, changed) in self.pending_notifications.drain(..) {
            if let Some(requester) = weak.upgrade() {
                requester.on_batch_resolved(changed);
            }
        }
    }
}
