use cgs_archive_index::{ArchiveIndex, AssetKind};

use tracing::debug;

use crate::{AssetHandle, BatchId, ConsumerRef, PlaceholderTemplates, RequestContext};

/// Lifecycle of a ledger entry.
///
/// An entry is born `Pending` and becomes `ArchiveReady` on the first
/// update tick that observes its archive downloaded. Promotion happens
/// no earlier than the following tick, so a consumer reacting to a
/// resolve call always gets at least one full tick holding the
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for the containing archive.
    Pending,
    /// Archive observed downloaded; promotable from the next tick on.
    ArchiveReady,
}

/// One outstanding placeholder and everything needed to promote it.
pub struct PendingDownloadItem {
    /// The name the caller asked for.
    pub required_name: String,
    /// Identity hash the placeholder was synthesized under.
    pub name_hash: i32,
    /// Asset kind.
    pub kind: AssetKind,
    /// The stand-in currently registered for this name.
    pub placeholder: AssetHandle,
    /// Archive that will deliver the real asset.
    pub containing_archive: String,
    /// Batch this item belongs to.
    pub batch_id: BatchId,
    /// Current lifecycle state.
    pub state: ItemState,
    pub(crate) requester: Option<ConsumerRef>,
}

/// Every placeholder currently standing in for a downloading asset.
///
/// Keyed by required name: a second request for a name already in the
/// ledger joins the existing entry and receives the existing
/// placeholder, whatever batch or archive it arrived with. Entries
/// leave the ledger only through promotion.
#[derive(Default)]
pub struct DownloadLedger {
    items: Vec<PendingDownloadItem>,
}

impl DownloadLedger {
    /// Record that `name` is on its way in `archive`, synthesizing (or
    /// reusing) the placeholder that stands in for it meanwhile.
    #[allow(clippy::too_many_arguments)]
    pub fn add_item(
        &mut self,
        kind: AssetKind,
        name: &str,
        name_hash: i32,
        archive: &str,
        ctx: &RequestContext,
        templates: &PlaceholderTemplates,
        index: &ArchiveIndex,
    ) -> AssetHandle {
        if let Some(existing) = self.items.iter().find(|item| item.required_name == name) {
            if existing.containing_archive != archive {
                debug!(
                    "'{}' already pending from '{}', ignoring '{}'",
                    name, existing.containing_archive, archive
                );
            }
            return AssetHandle::clone(&existing.placeholder);
        }

        debug!("'{}' queued for download from '{}'", name, archive);
        let placeholder = templates.synthesize(kind, name, name_hash, archive, index);
        self.items.push(PendingDownloadItem {
            required_name: name.to_owned(),
            name_hash,
            kind,
            placeholder: AssetHandle::clone(&placeholder),
            containing_archive: archive.to_owned(),
            batch_id: ctx.batch_id(),
            state: ItemState::Pending,
            requester: ctx.requester().cloned(),
        });
        placeholder
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of outstanding items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when `name` is still pending.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.required_name == name)
    }

    /// Names of every outstanding item.
    pub fn pending_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(|item| item.required_name.as_str())
            .collect()
    }

    /// The placeholder standing in for `name`, if pending.
    pub fn placeholder_of(&self, name: &str) -> Option<&AssetHandle> {
        self.items
            .iter()
            .find(|item| item.required_name == name)
            .map(|item| &item.placeholder)
    }

    /// The lifecycle state of `name`, if pending.
    pub fn state_of(&self, name: &str) -> Option<ItemState> {
        self.items
            .iter()
            .find(|item| item.required_name == name)
            .map(|item| item.state)
    }

    /// Ids of every batch with outstanding items, in first-seen order.
    pub fn batch_ids(&self) -> Vec<BatchId> {
        let mut ids = Vec::new();
        for item in &self.items {
            if !ids.contains(&item.batch_id) {
                ids.push(item.batch_id);
            }
        }
        ids
    }

    pub(crate) fn items_mut(&mut self) -> &mut [PendingDownloadItem] {
        &mut self.items
    }

    pub(crate) fn items_in_batch(
        &self,
        batch_id: BatchId,
    ) -> impl Iterator<Item = &PendingDownloadItem> {
        self.items.iter().filter(move |item| item.batch_id == batch_id)
    }

    /// Remove and return every item of `batch_id`.
    pub(crate) fn take_batch(&mut self, batch_id: BatchId) -> Vec<PendingDownloadItem> {
        let mut taken = Vec::new();
        let mut index = 0;
        while index < self.items.len() {
            if self.items[index].batch_id == batch_id {
                taken.push(self.items.remove(index));
            } else {
                index += 1;
            }
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use cgs_archive_index::{name_hash, DevCatalog};

    use crate::{OverlayData, RaceData, RecipeData, SlotData};

    use super::*;

    fn templates() -> PlaceholderTemplates {
        PlaceholderTemplates::new(
            RaceData {
                race_name: "PlaceholderRace".to_string(),
                display_name: "Loading...".to_string(),
                base_recipe: Some(RecipeData::base()),
            },
            SlotData::new("PlaceholderSlot"),
            OverlayData::new("PlaceholderOverlay"),
            RecipeData::base(),
        )
        .unwrap()
    }

    fn empty_index() -> ArchiveIndex {
        ArchiveIndex::from_catalog(DevCatalog::new())
    }

    #[test]
    fn duplicate_name_joins_existing_entry() {
        let mut ledger = DownloadLedger::default();
        let templates = templates();
        let index = empty_index();
        let ctx_a = RequestContext::new_batch();
        let ctx_b = RequestContext::new_batch();

        let first = ledger.add_item(
            AssetKind::Slot,
            "Boots",
            name_hash("Boots"),
            "clothesA",
            &ctx_a,
            &templates,
            &index,
        );
        let second = ledger.add_item(
            AssetKind::Slot,
            "Boots",
            name_hash("Boots"),
            "clothesB",
            &ctx_b,
            &templates,
            &index,
        );

        assert!(AssetHandle::ptr_eq(&first, &second));
        assert_eq!(ledger.len(), 1);
        // First archive wins.
        assert_eq!(ledger.items[0].containing_archive, "clothesA");
        assert_eq!(ledger.items[0].batch_id, ctx_a.batch_id());
    }

    #[test]
    fn batches_partition_items() {
        let mut ledger = DownloadLedger::default();
        let templates = templates();
        let index = empty_index();
        let ctx_a = RequestContext::new_batch();
        let ctx_b = RequestContext::new_batch();

        for (name, ctx) in [("Boots", &ctx_a), ("Gloves", &ctx_a), ("Hat", &ctx_b)] {
            ledger.add_item(
                AssetKind::Slot,
                name,
                name_hash(name),
                "clothesA",
                ctx,
                &templates,
                &index,
            );
        }

        assert_eq!(ledger.batch_ids().len(), 2);
        assert_eq!(ledger.items_in_batch(ctx_a.batch_id()).count(), 2);

        let taken = ledger.take_batch(ctx_a.batch_id());
        assert_eq!(taken.len(), 2);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("Hat"));
        assert_eq!(ledger.state_of("Hat"), Some(ItemState::Pending));
    }

    #[test]
    fn placeholder_is_queryable_while_pending() {
        let mut ledger = DownloadLedger::default();
        let templates = templates();
        let index = empty_index();
        let ctx = RequestContext::new_batch();

        let handle = ledger.add_item(
            AssetKind::Overlay,
            "BootsOverlay",
            name_hash("BootsOverlay"),
            "clothesA",
            &ctx,
            &templates,
            &index,
        );

        assert!(handle.placeholder);
        assert!(AssetHandle::ptr_eq(
            ledger.placeholder_of("BootsOverlay").unwrap(),
            &handle
        ));
        assert_eq!(ledger.pending_names(), vec!["BootsOverlay"]);
    }
}
