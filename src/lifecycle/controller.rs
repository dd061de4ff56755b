use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::core::{CanvasBox, ChartId, SeriesPoint};
use crate::error::{ChartError, ChartResult};
use crate::extensions::{LifecycleEvent, LifecycleListener, ListenerRegistry};
use crate::feed::{SeriesProvider, SeriesQuery};
use crate::library::{ChartBackend, ChartConfig};
use crate::runtime::{HostRuntime, TokioRuntime};

use super::canvas::ChartCanvas;
use super::config::{LifecycleConfig, UpdatePolicy};
use super::host::ChartHost;
use super::layout_gate::LayoutReadyGate;
use super::phase::ChartPhase;
use super::resizer::{ResizeSink, VisibilityResizer};
use super::snapshot::{ChartSnapshot, LifecycleSnapshot};
use super::update_gate::UpdateGate;

/// What happened to one `apply` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The dataset was bound and the chart repainted.
    Rendered,
    /// Another update was in flight; this one was discarded.
    Dropped,
    /// Another update was in flight; this one was parked and will be applied
    /// by the running update.
    Coalesced,
    /// The library rejected the data or the repaint; the previous frame stays.
    RenderFailed,
    /// The chart was unmounted while the update was in flight.
    Cancelled,
    /// The provider had nothing for this cycle.
    NoData,
    /// A newer query superseded the one this response belongs to.
    Stale,
}

struct MountSlot {
    phase: ChartPhase,
    cancel_mount: Option<AbortHandle>,
}

/// Composes the layout gate, host, resizer and update gate behind the three
/// operations panels use: `mount`, `apply` and `unmount`.
///
/// One controller serves a page session. It is `!Send` and must be driven from
/// the UI thread's event loop.
pub struct ChartLifecycleController<B: ChartBackend + 'static> {
    config: LifecycleConfig,
    chart_config: ChartConfig,
    runtime: Rc<dyn HostRuntime>,
    host: Rc<ChartHost<B>>,
    layout_gate: LayoutReadyGate,
    resizer: VisibilityResizer,
    updates: UpdateGate<Vec<SeriesPoint>>,
    slots: RefCell<IndexMap<ChartId, MountSlot>>,
    listeners: Rc<ListenerRegistry>,
}

impl<B: ChartBackend + 'static> ChartLifecycleController<B> {
    pub fn new(
        backend: B,
        runtime: Rc<dyn HostRuntime>,
        config: LifecycleConfig,
    ) -> ChartResult<Self> {
        let config = config.validate()?;
        let host = Rc::new(ChartHost::new(backend));
        let listeners = Rc::new(ListenerRegistry::default());
        let resizer = VisibilityResizer::new(
            Rc::clone(&runtime),
            config.resize,
            resize_sink(Rc::clone(&host), Rc::clone(&listeners)),
        );
        let layout_gate =
            LayoutReadyGate::for_strategy(config.layout_strategy, Rc::clone(&runtime), config.layout);

        Ok(Self {
            config,
            chart_config: ChartConfig::default(),
            runtime,
            host,
            layout_gate,
            resizer,
            updates: UpdateGate::new(),
            slots: RefCell::new(IndexMap::new()),
            listeners,
        })
    }

    /// Controller on tokio local tasks. Must be driven inside a `LocalSet`.
    pub fn with_tokio(backend: B, config: LifecycleConfig) -> ChartResult<Self> {
        Self::new(backend, Rc::new(TokioRuntime), config)
    }

    /// Chart config used by `mount` and `mount_with_id`.
    pub fn with_chart_config(mut self, chart_config: ChartConfig) -> ChartResult<Self> {
        chart_config.validate()?;
        self.chart_config = chart_config;
        Ok(self)
    }

    #[must_use]
    pub fn config(&self) -> LifecycleConfig {
        self.config
    }

    #[must_use]
    pub fn runtime(&self) -> Rc<dyn HostRuntime> {
        Rc::clone(&self.runtime)
    }

    #[must_use]
    pub fn host(&self) -> &ChartHost<B> {
        &self.host
    }

    /// Mounts a chart under a freshly generated identifier.
    pub async fn mount(&self, canvas: Rc<B::Canvas>) -> ChartResult<ChartId> {
        let id = ChartId::generate("chart");
        self.mount_with_id(id.clone(), canvas).await?;
        Ok(id)
    }

    pub async fn mount_with_id(&self, id: ChartId, canvas: Rc<B::Canvas>) -> ChartResult<()> {
        let chart_config = self.chart_config.clone();
        self.mount_configured(id, canvas, chart_config).await
    }

    /// Waits for layout, constructs the instance and starts observing the
    /// container.
    ///
    /// An `unmount` that lands while the layout wait is pending cancels it;
    /// the mount then fails with `ChartDestroyed` without having attached
    /// anything.
    pub async fn mount_configured(
        &self,
        id: ChartId,
        canvas: Rc<B::Canvas>,
        chart_config: ChartConfig,
    ) -> ChartResult<()> {
        chart_config.validate()?;
        let registration = {
            let mut slots = self.slots.borrow_mut();
            match slots.get(&id).map(|slot| slot.phase) {
                Some(ChartPhase::Destroyed) => return Err(ChartError::ChartDestroyed { id }),
                Some(_) => return Err(ChartError::DuplicateChart { id }),
                None => {}
            }
            let (cancel, registration) = AbortHandle::new_pair();
            slots.insert(
                id.clone(),
                MountSlot {
                    phase: ChartPhase::AwaitingLayout,
                    cancel_mount: Some(cancel),
                },
            );
            registration
        };
        debug!(chart_id = %id, "mount started; waiting for layout");
        self.listeners.emit(LifecycleEvent::MountStarted {
            chart_id: id.clone(),
        });

        let container: Rc<dyn ChartCanvas> = canvas.clone();
        let wait = Abortable::new(
            self.layout_gate.wait_until_ready(container.as_ref()),
            registration,
        );
        let Ok(readiness) = wait.await else {
            debug!(chart_id = %id, "unmounted while waiting for layout");
            self.listeners.emit(LifecycleEvent::MountAbandoned {
                chart_id: id.clone(),
                reason: "unmounted while waiting for layout".to_owned(),
            });
            return Err(ChartError::ChartDestroyed { id });
        };
        if self.phase(&id) != ChartPhase::AwaitingLayout {
            return Err(ChartError::ChartDestroyed { id });
        }
        if !readiness.is_ready() {
            warn!(
                chart_id = %id,
                retries = readiness.retries,
                outcome = ?readiness.outcome,
                "layout not ready; constructing chart best effort"
            );
        }

        if let Err(err) = self.host.create(&id, canvas.as_ref(), &chart_config) {
            self.slots.borrow_mut().shift_remove(&id);
            warn!(chart_id = %id, error = %err, "chart construction failed");
            self.listeners.emit(LifecycleEvent::MountAbandoned {
                chart_id: id.clone(),
                reason: err.to_string(),
            });
            return Err(err);
        }

        if let Err(err) = self.resizer.attach(&id, container) {
            warn!(chart_id = %id, error = %err, "mounted without a layout observer");
        }

        if let Some(slot) = self.slots.borrow_mut().get_mut(&id) {
            slot.phase = ChartPhase::Initialized;
            slot.cancel_mount = None;
        }
        info!(chart_id = %id, retries = readiness.retries, "chart mounted");
        self.listeners.emit(LifecycleEvent::Mounted {
            chart_id: id,
            layout_ready: readiness.is_ready(),
            retries: readiness.retries,
        });
        Ok(())
    }

    /// Replaces the chart's data and schedules a repaint on the next tick.
    ///
    /// At most one apply per chart is in flight; what happens to a request
    /// that arrives meanwhile depends on the configured `UpdatePolicy`.
    pub async fn apply(&self, id: &ChartId, series: Vec<SeriesPoint>) -> ChartResult<ApplyOutcome> {
        self.ensure_accepts_updates(id)?;
        let Some(_pending) = self.updates.try_acquire(id) else {
            return Ok(self.on_busy(id, series));
        };

        let mut outcome = self.apply_once(id, series).await;
        while outcome != ApplyOutcome::Cancelled {
            let Some(latest) = self.updates.take_parked(id) else {
                break;
            };
            trace!(chart_id = %id, "applying parked update");
            outcome = self.apply_once(id, latest).await;
        }
        Ok(outcome)
    }

    /// Fetches from `provider` and applies the result.
    ///
    /// Provider errors are logged and reported as `NoData`.
    pub async fn refresh<P>(
        &self,
        id: &ChartId,
        provider: &P,
        query: &SeriesQuery,
    ) -> ChartResult<ApplyOutcome>
    where
        P: SeriesProvider + ?Sized,
    {
        self.ensure_accepts_updates(id)?;
        match provider.fetch(query).await {
            Ok(series) => self.apply(id, series).await,
            Err(err) => {
                warn!(chart_id = %id, %query, error = %err, "series fetch failed; no data this cycle");
                Ok(ApplyOutcome::NoData)
            }
        }
    }

    /// Tears the chart down: cancels a pending mount, releases its observer
    /// and destroys the instance. Repeated calls are no-ops.
    ///
    /// Called from inside a library callback of the same controller, the
    /// instance cannot be disposed yet; the error is returned and the chart
    /// stays mounted so the call can be repeated.
    pub fn unmount(&self, id: &ChartId) -> ChartResult<()> {
        match self.slots.borrow().get(id).map(|slot| slot.phase) {
            None => return Err(ChartError::UnknownChart { id: id.clone() }),
            Some(ChartPhase::Destroyed) => {
                trace!(chart_id = %id, "already unmounted");
                return Ok(());
            }
            Some(_) => {}
        }

        let disposed = self.host.destroy(id)?;
        let cancel_mount = {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.get_mut(id) else {
                return Err(ChartError::UnknownChart { id: id.clone() });
            };
            // The instance's own teardown may have unmounted it already.
            if slot.phase == ChartPhase::Destroyed {
                return Ok(());
            }
            slot.phase = ChartPhase::Destroyed;
            slot.cancel_mount.take()
        };

        if let Some(cancel) = cancel_mount {
            cancel.abort();
        }
        let released = self.resizer.detach(id);
        self.updates.forget(id);
        debug!(chart_id = %id, released, disposed, "chart unmounted");
        self.listeners.emit(LifecycleEvent::Unmounted {
            chart_id: id.clone(),
        });
        Ok(())
    }

    /// Current phase; `Unmounted` for identifiers this controller never saw.
    #[must_use]
    pub fn phase(&self, id: &ChartId) -> ChartPhase {
        let phase = self
            .slots
            .borrow()
            .get(id)
            .map_or(ChartPhase::Unmounted, |slot| slot.phase);
        if phase == ChartPhase::Initialized && self.updates.is_pending(id) {
            ChartPhase::Updating
        } else {
            phase
        }
    }

    #[must_use]
    pub fn nearest_point(&self, id: &ChartId, timestamp: i64) -> Option<SeriesPoint> {
        self.host.nearest_point(id, timestamp)
    }

    #[must_use]
    pub fn active_observers(&self) -> usize {
        self.resizer.active_observers()
    }

    pub fn notify_window_resize(&self) {
        self.resizer.notify_window_resize();
    }

    /// `None` uses the configured transition duration.
    pub fn notify_layout_transition(&self, duration: Option<Duration>) {
        self.resizer.notify_layout_transition(duration);
    }

    pub fn notify_visibility_change(&self) {
        self.resizer.notify_visibility_change();
    }

    pub fn register_listener(&self, listener: Box<dyn LifecycleListener>) -> ChartResult<()> {
        self.listeners.register(listener)
    }

    pub fn unregister_listener(&self, listener_id: &str) -> bool {
        self.listeners.unregister(listener_id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        let ids: Vec<ChartId> = self.slots.borrow().keys().cloned().collect();
        let charts = ids
            .into_iter()
            .map(|id| {
                let record = self.host.get(&id);
                ChartSnapshot {
                    phase: self.phase(&id),
                    points: record.as_ref().map_or(0, |record| record.raw.len()),
                    size: record.as_ref().map(|record| record.size),
                    has_instance: record.as_ref().is_some_and(|record| !record.destroyed),
                    observed: self.resizer.is_attached(&id),
                    render_failures: record.as_ref().map_or(0, |record| record.render_failures),
                    chart_id: id,
                }
            })
            .collect();
        LifecycleSnapshot {
            charts,
            active_observers: self.resizer.active_observers(),
            pending_updates: self.updates.pending_count(),
            resizer: self.resizer.stats(),
        }
    }

    pub(crate) fn ensure_accepts_updates(&self, id: &ChartId) -> ChartResult<()> {
        let phase = self.slots.borrow().get(id).map(|slot| slot.phase);
        match phase {
            None | Some(ChartPhase::Unmounted) => Err(ChartError::UnknownChart { id: id.clone() }),
            Some(ChartPhase::Destroyed) => Err(ChartError::ChartDestroyed { id: id.clone() }),
            Some(ChartPhase::AwaitingLayout) => Err(ChartError::NotInitialized { id: id.clone() }),
            Some(ChartPhase::Initialized | ChartPhase::Updating) => Ok(()),
        }
    }

    fn on_busy(&self, id: &ChartId, series: Vec<SeriesPoint>) -> ApplyOutcome {
        match self.config.update_policy {
            UpdatePolicy::DropWhileBusy => {
                debug!(chart_id = %id, points = series.len(), "update in flight; request dropped");
                self.listeners.emit(LifecycleEvent::UpdateDropped {
                    chart_id: id.clone(),
                });
                ApplyOutcome::Dropped
            }
            UpdatePolicy::CoalesceLatest => {
                let replaced = self.updates.park_latest(id, series);
                debug!(chart_id = %id, replaced, "update in flight; request parked");
                self.listeners.emit(LifecycleEvent::UpdateCoalesced {
                    chart_id: id.clone(),
                });
                ApplyOutcome::Coalesced
            }
        }
    }

    async fn apply_once(&self, id: &ChartId, series: Vec<SeriesPoint>) -> ApplyOutcome {
        let points = match self.host.apply_dataset(id, series) {
            Ok(points) => points,
            Err(err) => return self.on_apply_error(id, err),
        };

        // Repaint on a later tick than the data write.
        self.runtime.next_tick().await;
        if !self.phase(id).is_live() {
            debug!(chart_id = %id, "unmounted before redraw");
            return ApplyOutcome::Cancelled;
        }

        match self.host.redraw(id) {
            Ok(()) => {
                trace!(chart_id = %id, points, "chart redrawn");
                self.listeners.emit(LifecycleEvent::Applied {
                    chart_id: id.clone(),
                    points,
                });
                ApplyOutcome::Rendered
            }
            Err(err) => self.on_apply_error(id, err),
        }
    }

    fn on_apply_error(&self, id: &ChartId, err: ChartError) -> ApplyOutcome {
        match err {
            ChartError::ChartDestroyed { .. } | ChartError::UnknownChart { .. } => {
                ApplyOutcome::Cancelled
            }
            err => {
                warn!(chart_id = %id, error = %err, "render failed; keeping previous frame");
                self.listeners.emit(LifecycleEvent::RenderFailed {
                    chart_id: id.clone(),
                    error: err.to_string(),
                });
                ApplyOutcome::RenderFailed
            }
        }
    }
}

impl<B: ChartBackend + 'static> Drop for ChartLifecycleController<B> {
    fn drop(&mut self) {
        let live: Vec<ChartId> = self
            .slots
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.phase != ChartPhase::Destroyed)
            .map(|(id, _)| id.clone())
            .collect();
        for id in live {
            if let Err(err) = self.unmount(&id) {
                warn!(chart_id = %id, error = %err, "unmount on controller drop failed");
            }
        }
    }
}

fn resize_sink<B: ChartBackend + 'static>(
    host: Rc<ChartHost<B>>,
    listeners: Rc<ListenerRegistry>,
) -> ResizeSink {
    Rc::new(move |id: &ChartId, size: CanvasBox| {
        host.resize(id, size)?;
        trace!(chart_id = %id, width = size.width, height = size.height, "chart resized");
        listeners.emit(LifecycleEvent::Resized {
            chart_id: id.clone(),
            width: size.width,
            height: size.height,
        });
        Ok(())
    })
}
