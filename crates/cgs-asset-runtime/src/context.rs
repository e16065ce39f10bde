use rand::Rng;

use crate::ConsumerRef;

/// Identifier grouping several pending downloads into one batch.
///
/// Random in a large range: ids only need to be unique among
/// concurrently open batches, not across the process lifetime.
pub type BatchId = u32;

const BATCH_ID_RANGE: std::ops::Range<BatchId> = 1_000_000..2_000_000;

/// Explicit request context carried into every resolve call.
///
/// Everything resolved through the same context lands in the same
/// batch: the bound requester is rebuilt once, after *all* of those
/// requests are resolved, instead of once per asset.
#[derive(Clone)]
pub struct RequestContext {
    batch_id: BatchId,
    requester: Option<ConsumerRef>,
}

impl RequestContext {
    /// A fresh batch with no bound requester.
    pub fn new_batch() -> Self {
        Self {
            batch_id: rand::thread_rng().gen_range(BATCH_ID_RANGE),
            requester: None,
        }
    }

    /// Bind the consumer to notify once the batch resolves.
    #[must_use]
    pub fn with_requester(mut self, requester: ConsumerRef) -> Self {
        self.requester = Some(requester);
        self
    }

    /// The batch id.
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub(crate) fn requester(&self) -> Option<&ConsumerRef> {
        self.requester.as_ref()
    }
}
