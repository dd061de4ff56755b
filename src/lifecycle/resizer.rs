use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::core::{CanvasBox, ChartId};
use crate::error::{ChartError, ChartResult};
use crate::runtime::{HostRuntime, TaskHandle};

use super::canvas::{ChartCanvas, ObserverHandle};
use super::config::ResizeOptions;

/// Receives `(chart, new size)` whenever a visible container changed size.
pub type ResizeSink = Rc<dyn Fn(&ChartId, CanvasBox) -> ChartResult<()>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizerStats {
    pub resizes_dispatched: u64,
    pub hidden_skipped: u64,
    pub resize_failures: u64,
}

struct Attachment {
    container: Rc<dyn ChartCanvas>,
    observer: ObserverHandle,
    /// Last size handed to the sink while visible; reset when hidden.
    last_visible: Option<CanvasBox>,
}

#[derive(Debug, Clone, Copy)]
enum DeferredPass {
    Window,
    Transition,
}

struct ResizerShared {
    runtime: Rc<dyn HostRuntime>,
    options: ResizeOptions,
    sink: ResizeSink,
    attachments: RefCell<IndexMap<ChartId, Attachment>>,
    window_task: RefCell<Option<TaskHandle>>,
    transition_task: RefCell<Option<TaskHandle>>,
    visibility_task: RefCell<Option<TaskHandle>>,
    stats: Cell<ResizerStats>,
}

/// Keeps chart instances sized to their containers.
///
/// Layout callbacks from hidden containers (zero area or not displayed) never
/// reach the sink. Window resizes are debounced; layout transitions and
/// visibility changes schedule a deferred re-measure of every attached chart.
pub struct VisibilityResizer {
    shared: Rc<ResizerShared>,
}

impl VisibilityResizer {
    #[must_use]
    pub fn new(runtime: Rc<dyn HostRuntime>, options: ResizeOptions, sink: ResizeSink) -> Self {
        Self {
            shared: Rc::new(ResizerShared {
                runtime,
                options,
                sink,
                attachments: RefCell::new(IndexMap::new()),
                window_task: RefCell::new(None),
                transition_task: RefCell::new(None),
                visibility_task: RefCell::new(None),
                stats: Cell::new(ResizerStats::default()),
            }),
        }
    }

    /// Subscribes to layout changes of `container` on behalf of `id`.
    ///
    /// Every successful `attach` must be paired with a [`VisibilityResizer::detach`].
    pub fn attach(&self, id: &ChartId, container: Rc<dyn ChartCanvas>) -> ChartResult<()> {
        if self.is_attached(id) {
            return Err(ChartError::DuplicateChart { id: id.clone() });
        }

        let weak: Weak<ResizerShared> = Rc::downgrade(&self.shared);
        let observed_id = id.clone();
        let observer = container
            .observe_layout(Rc::new(move |changed: CanvasBox| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_layout_change(&observed_id, changed);
                }
            }))
            .map_err(|err| match err {
                ChartError::ObserverUnavailable(_) => err,
                other => ChartError::ObserverUnavailable(other.to_string()),
            })?;

        let last_visible = container.measure().filter(|size| size.is_visible());
        self.shared.attachments.borrow_mut().insert(
            id.clone(),
            Attachment {
                container,
                observer,
                last_visible,
            },
        );
        debug!(chart_id = %id, "layout observer attached");
        Ok(())
    }

    /// Releases the observer for `id`. Returns `false` when nothing was attached.
    pub fn detach(&self, id: &ChartId) -> bool {
        let removed = self.shared.attachments.borrow_mut().shift_remove(id);
        match removed {
            Some(mut attachment) => {
                attachment.observer.release();
                debug!(chart_id = %id, "layout observer released");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_attached(&self, id: &ChartId) -> bool {
        self.shared.attachments.borrow().contains_key(id)
    }

    #[must_use]
    pub fn active_observers(&self) -> usize {
        self.shared
            .attachments
            .borrow()
            .values()
            .filter(|attachment| attachment.observer.is_active())
            .count()
    }

    #[must_use]
    pub fn stats(&self) -> ResizerStats {
        self.shared.stats.get()
    }

    /// Coalesces a burst of window resize events into one pass over every
    /// visible chart after the debounce window.
    pub fn notify_window_resize(&self) {
        let delay = self.shared.options.window_debounce();
        self.shared.schedule_pass(DeferredPass::Window, delay);
    }

    /// Re-measures every chart once `duration` (default: the configured
    /// transition time) has elapsed. A newer notification replaces a pending
    /// one.
    pub fn notify_layout_transition(&self, duration: Option<Duration>) {
        let delay = duration.unwrap_or_else(|| self.shared.options.transition());
        self.shared.schedule_pass(DeferredPass::Transition, delay);
    }

    /// A tab or panel became visible or hidden: re-measure on the next tick.
    pub fn notify_visibility_change(&self) {
        let shared = Rc::downgrade(&self.shared);
        let tick = self.shared.runtime.next_tick();
        let task = self.shared.runtime.spawn_cancellable(Box::pin(async move {
            tick.await;
            if let Some(shared) = shared.upgrade() {
                shared.visibility_task.borrow_mut().take();
                shared.resize_visible(false);
            }
        }));
        if let Some(previous) = self.shared.visibility_task.replace(Some(task)) {
            previous.cancel();
        }
    }

    /// Runs one re-measure pass right away. `force` re-sends sizes that did not
    /// change since the last pass.
    pub fn resize_visible_now(&self, force: bool) {
        self.shared.resize_visible(force);
    }
}

impl Drop for VisibilityResizer {
    fn drop(&mut self) {
        for task in [
            &self.shared.window_task,
            &self.shared.transition_task,
            &self.shared.visibility_task,
        ] {
            if let Some(task) = task.borrow_mut().take() {
                task.cancel();
            }
        }
        let drained: Vec<Attachment> = self
            .shared
            .attachments
            .borrow_mut()
            .drain(..)
            .map(|(_, attachment)| attachment)
            .collect();
        if !drained.is_empty() {
            warn!(count = drained.len(), "resizer dropped with attached observers; releasing");
        }
    }
}

impl ResizerShared {
    fn on_layout_change(&self, id: &ChartId, changed: CanvasBox) {
        {
            let Ok(mut attachments) = self.attachments.try_borrow_mut() else {
                trace!(chart_id = %id, "layout change during a resize pass ignored");
                return;
            };
            let Some(attachment) = attachments.get_mut(id) else {
                trace!(chart_id = %id, "layout change after detach ignored");
                return;
            };
            if !changed.is_visible() {
                attachment.last_visible = None;
                self.bump(|stats| stats.hidden_skipped += 1);
                trace!(chart_id = %id, "container hidden; resize skipped");
                return;
            }
            if attachment.last_visible == Some(changed) {
                return;
            }
            attachment.last_visible = Some(changed);
        }
        self.dispatch(id, changed);
    }

    fn resize_visible(&self, force: bool) {
        let targets: SmallVec<[(ChartId, CanvasBox); 8]> = {
            let mut attachments = self.attachments.borrow_mut();
            attachments
                .iter_mut()
                .filter_map(|(id, attachment)| {
                    let measured = attachment.container.measure()?;
                    if !measured.is_visible() {
                        attachment.last_visible = None;
                        self.bump(|stats| stats.hidden_skipped += 1);
                        return None;
                    }
                    if !force && attachment.last_visible == Some(measured) {
                        return None;
                    }
                    attachment.last_visible = Some(measured);
                    Some((id.clone(), measured))
                })
                .collect()
        };

        trace!(charts = targets.len(), force, "resize pass");
        for (id, size) in targets {
            self.dispatch(&id, size);
        }
    }

    fn dispatch(&self, id: &ChartId, size: CanvasBox) {
        self.bump(|stats| stats.resizes_dispatched += 1);
        if let Err(err) = (self.sink)(id, size) {
            self.bump(|stats| stats.resize_failures += 1);
            warn!(chart_id = %id, error = %err, "chart resize failed; keeping previous frame");
        }
    }

    fn schedule_pass(self: &Rc<Self>, pass: DeferredPass, delay: Duration) {
        let weak = Rc::downgrade(self);
        let sleep = self.runtime.sleep(delay);
        let task = self.runtime.spawn_cancellable(Box::pin(async move {
            sleep.await;
            if let Some(shared) = weak.upgrade() {
                shared.slot(pass).borrow_mut().take();
                shared.resize_visible(true);
            }
        }));
        if let Some(previous) = self.slot(pass).replace(Some(task)) {
            previous.cancel();
        }
    }

    fn slot(&self, pass: DeferredPass) -> &RefCell<Option<TaskHandle>> {
        match pass {
            DeferredPass::Window => &self.window_task,
            DeferredPass::Transition => &self.transition_task,
        }
    }

    fn bump(&self, update: impl FnOnce(&mut ResizerStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}
