use std::cell::RefCell;
use std::future::Future;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::core::ChartId;

/// Per-chart re-entrancy guard for dataset updates.
///
/// At most one update per chart is in flight. The pending flag is owned by a
/// [`PendingGuard`], so it is cleared on every exit path of the guarded work,
/// including early returns, errors and cancelled futures.
///
/// The gate also keeps a single "latest" slot per chart for callers that
/// coalesce instead of dropping; parking a payload replaces whatever was
/// parked before. The holder of the guard is expected to drain the slot;
/// whatever is still parked when the guard is released is discarded.
pub struct UpdateGate<T> {
    pending: RefCell<IndexSet<ChartId>>,
    parked: RefCell<IndexMap<ChartId, T>>,
}

impl<T> Default for UpdateGate<T> {
    fn default() -> Self {
        Self {
            pending: RefCell::new(IndexSet::new()),
            parked: RefCell::new(IndexMap::new()),
        }
    }
}

impl<T> UpdateGate<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` pending, or returns `None` when an update is already in flight.
    #[must_use]
    pub fn try_acquire(&self, id: &ChartId) -> Option<PendingGuard<'_, T>> {
        if !self.pending.borrow_mut().insert(id.clone()) {
            trace!(chart_id = %id, "update already in flight");
            return None;
        }
        Some(PendingGuard {
            gate: self,
            id: id.clone(),
        })
    }

    #[must_use]
    pub fn is_pending(&self, id: &ChartId) -> bool {
        self.pending.borrow().contains(id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Runs `work` unless an update for `id` is in flight.
    pub fn run_exclusive<R>(&self, id: &ChartId, work: impl FnOnce() -> R) -> Option<R> {
        let _pending = self.try_acquire(id)?;
        Some(work())
    }

    /// Async form of [`UpdateGate::run_exclusive`]; the flag stays set across
    /// every suspension point of `work`.
    pub async fn run_exclusive_async<R, F>(&self, id: &ChartId, work: impl FnOnce() -> F) -> Option<R>
    where
        F: Future<Output = R>,
    {
        let _pending = self.try_acquire(id)?;
        Some(work().await)
    }

    /// Stores `payload` as the newest request for `id`.
    ///
    /// Returns `true` when an older parked payload was replaced.
    pub fn park_latest(&self, id: &ChartId, payload: T) -> bool {
        self.parked
            .borrow_mut()
            .insert(id.clone(), payload)
            .is_some()
    }

    pub fn take_parked(&self, id: &ChartId) -> Option<T> {
        self.parked.borrow_mut().shift_remove(id)
    }

    #[must_use]
    pub fn has_parked(&self, id: &ChartId) -> bool {
        self.parked.borrow().contains_key(id)
    }

    /// Discards any parked payload for `id`. The pending flag is left to its
    /// guard.
    pub fn forget(&self, id: &ChartId) {
        self.parked.borrow_mut().shift_remove(id);
    }
}

/// Clears the pending flag of one chart on drop, along with any payload
/// parked for it that the holder did not drain.
#[must_use = "the update is only guarded while the guard is alive"]
pub struct PendingGuard<'a, T> {
    gate: &'a UpdateGate<T>,
    id: ChartId,
}

impl<T> PendingGuard<'_, T> {
    #[must_use]
    pub fn chart_id(&self) -> &ChartId {
        &self.id
    }
}

impl<T> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut parked) = self.gate.parked.try_borrow_mut() {
            if parked.shift_remove(&self.id).is_some() {
                trace!(chart_id = %self.id, "parked update discarded with its guard");
            }
        }
        if let Ok(mut pending) = self.gate.pending.try_borrow_mut() {
            pending.shift_remove(&self.id);
        }
    }
}
