use std::sync::Weak;

use crate::AssetHandle;

/// Asset categories that changed for a requester during promotion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedCategories {
    /// The active race was replaced.
    pub race: bool,
    /// One or more slots were promoted.
    pub slots: bool,
    /// One or more overlays were promoted.
    pub overlays: bool,
    /// One or more recipes were attached.
    pub recipes: bool,
}

impl ChangedCategories {
    /// True when no category changed.
    pub fn is_empty(&self) -> bool {
        !(self.race || self.slots || self.overlays || self.recipes)
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.race |= other.race;
        self.slots |= other.slots;
        self.overlays |= other.overlays;
        self.recipes |= other.recipes;
    }
}

/// A consumer of streamed assets, bound to a batch through
/// [`crate::RequestContext::with_requester`].
///
/// The ledger never owns the consumer: it holds a [`ConsumerRef`] and
/// skips requester-scoped work if the consumer is gone by promotion
/// time.
///
/// All methods default to no-ops so non-avatar consumers can implement
/// only [`Requester::on_batch_resolved`] and treat it as a generic
/// mark-dirty signal. An avatar implementation would refresh its recipe
/// index when `changed.recipes` is set and then rebuild itself
/// unconditionally.
pub trait Requester: Send + Sync {
    /// The promoted race is now this requester's active race (its base
    /// recipe replaces the placeholder one).
    fn set_active_race(&self, _race: &AssetHandle) {}

    /// Attach a promoted recipe to this requester's recipe collection.
    /// Recipes are requester-scoped, never global.
    fn add_recipe(&self, _recipe: &AssetHandle) {}

    /// Bind a promoted animator controller into this requester's
    /// per-race animator table.
    fn set_animator(&self, _controller: &AssetHandle) {}

    /// Invoked at most once per batch, after the whole batch promoted.
    /// The requester is guaranteed a fully-consistent view: no mix of
    /// placeholder and real assets from the same batch.
    fn on_batch_resolved(&self, _changed: ChangedCategories) {}
}

/// Non-owning back-reference to a [`Requester`].
pub type ConsumerRef = Weak<dyn Requester>;
