#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use chart_lifecycle::core::{CanvasBox, SeriesPoint, Viewport};
use chart_lifecycle::error::{ChartError, ChartResult};
use chart_lifecycle::feed::{ProviderError, SeriesProvider, SeriesQuery};
use chart_lifecycle::library::{ChartBackend, ChartConfig, ChartInstance, Dataset, RedrawMode};
use chart_lifecycle::lifecycle::{
    ChartCanvas, ChartLifecycleController, LayoutObserver, LayoutReadyOptions, LifecycleConfig,
    ObserverHandle,
};
use chart_lifecycle::runtime::{HostRuntime, TokioRuntime};
use futures::future::LocalBoxFuture;

pub const HEIGHT: u32 = 200;

#[derive(Default)]
struct CanvasState {
    scripted: RefCell<VecDeque<Option<CanvasBox>>>,
    current: Cell<Option<CanvasBox>>,
    observers: RefCell<Vec<(u64, LayoutObserver)>>,
    every_observer: RefCell<Vec<LayoutObserver>>,
    next_token: Cell<u64>,
    subscriptions: Cell<usize>,
    releases: Cell<usize>,
    refuse_observers: Cell<bool>,
}

/// Canvas whose measurements are scripted by the test.
#[derive(Clone, Default)]
pub struct FakeCanvas {
    state: Rc<CanvasState>,
}

impl FakeCanvas {
    pub fn laid_out(width: u32, height: u32) -> Self {
        let canvas = Self::default();
        canvas.state.current.set(Some(CanvasBox::new(width, height)));
        canvas
    }

    /// Canvas that reports the given widths on consecutive measurements and
    /// keeps the last one afterwards.
    pub fn with_widths(widths: &[u32]) -> Self {
        let canvas = Self::default();
        canvas
            .state
            .scripted
            .borrow_mut()
            .extend(widths.iter().map(|&width| Some(CanvasBox::new(width, HEIGHT))));
        canvas.state.current.set(Some(CanvasBox::new(0, HEIGHT)));
        canvas
    }

    pub fn script(&self, measurements: impl IntoIterator<Item = Option<CanvasBox>>) {
        self.state.scripted.borrow_mut().extend(measurements);
    }

    /// Changes the box without notifying observers.
    pub fn set_box(&self, size: CanvasBox) {
        self.state.current.set(Some(size));
    }

    /// Changes the box and notifies observers, like a host layout pass.
    pub fn resize_to(&self, size: CanvasBox) {
        self.set_box(size);
        self.fire();
    }

    pub fn detach(&self) {
        self.state.scripted.borrow_mut().clear();
        self.state.current.set(None);
    }

    pub fn fire(&self) {
        let Some(size) = self.state.current.get() else {
            return;
        };
        let observers: Vec<LayoutObserver> = self
            .state
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(size);
        }
    }

    pub fn refuse_observers(&self) {
        self.state.refuse_observers.set(true);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state.observers.borrow().len()
    }

    pub fn total_subscriptions(&self) -> usize {
        self.state.subscriptions.get()
    }

    pub fn releases(&self) -> usize {
        self.state.releases.get()
    }

    /// Every observer ever registered, including released ones.
    pub fn every_observer(&self) -> Vec<LayoutObserver> {
        self.state.every_observer.borrow().clone()
    }
}

impl ChartCanvas for FakeCanvas {
    fn measure(&self) -> Option<CanvasBox> {
        if let Some(next) = self.state.scripted.borrow_mut().pop_front() {
            self.state.current.set(next);
        }
        self.state.current.get()
    }

    fn observe_layout(&self, observer: LayoutObserver) -> ChartResult<ObserverHandle> {
        if self.state.refuse_observers.get() {
            return Err(ChartError::ObserverUnavailable(
                "fake canvas refuses observers".to_owned(),
            ));
        }
        let token = self.state.next_token.get();
        self.state.next_token.set(token + 1);
        self.state.subscriptions.set(self.state.subscriptions.get() + 1);
        self.state.every_observer.borrow_mut().push(Rc::clone(&observer));
        self.state.observers.borrow_mut().push((token, observer));

        let state = Rc::clone(&self.state);
        Ok(ObserverHandle::new(move || {
            state.releases.set(state.releases.get() + 1);
            state
                .observers
                .borrow_mut()
                .retain(|(registered, _)| *registered != token);
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryCall {
    Construct { width: u32, height: u32 },
    SetData { lens: Vec<usize> },
    Redraw(RedrawMode),
    Resize { width: u32, height: u32 },
    Destroy,
}

#[derive(Default)]
pub struct LibraryState {
    calls: RefCell<Vec<LibraryCall>>,
    shown: RefCell<Option<Vec<Dataset>>>,
    pub fail_construct: Cell<bool>,
    pub fail_set_data: Cell<bool>,
    pub fail_redraw: Cell<bool>,
    /// Runs inside `redraw`, while the host registry is borrowed.
    pub on_redraw: RefCell<Option<Box<dyn Fn()>>>,
}

/// Chart library fake that logs every call.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub state: Rc<LibraryState>,
}

impl RecordingBackend {
    pub fn calls(&self) -> Vec<LibraryCall> {
        self.state.calls.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&LibraryCall) -> bool) -> usize {
        self.state.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn constructs(&self) -> usize {
        self.count(|call| matches!(call, LibraryCall::Construct { .. }))
    }

    pub fn set_data_calls(&self) -> usize {
        self.count(|call| matches!(call, LibraryCall::SetData { .. }))
    }

    pub fn redraws(&self) -> usize {
        self.count(|call| matches!(call, LibraryCall::Redraw(_)))
    }

    pub fn destroys(&self) -> usize {
        self.count(|call| matches!(call, LibraryCall::Destroy))
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.state
            .calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                LibraryCall::Resize { width, height } => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }

    /// Values of the first dataset as last painted.
    pub fn shown_values(&self) -> Option<Vec<f64>> {
        self.state.shown.borrow().as_ref().map(|datasets| {
            datasets
                .first()
                .map(|dataset| dataset.samples.iter().map(|(_, value)| *value).collect())
                .unwrap_or_default()
        })
    }
}

pub struct RecordingInstance {
    state: Rc<LibraryState>,
    data: Vec<Dataset>,
}

impl ChartBackend for RecordingBackend {
    type Canvas = FakeCanvas;
    type Instance = RecordingInstance;

    fn construct(
        &self,
        _canvas: &FakeCanvas,
        _config: &ChartConfig,
        viewport: Viewport,
    ) -> ChartResult<RecordingInstance> {
        if self.state.fail_construct.get() {
            return Err(ChartError::RenderFailure("construct refused".to_owned()));
        }
        self.state.calls.borrow_mut().push(LibraryCall::Construct {
            width: viewport.width,
            height: viewport.height,
        });
        Ok(RecordingInstance {
            state: Rc::clone(&self.state),
            data: Vec::new(),
        })
    }
}

impl ChartInstance for RecordingInstance {
    fn set_data(&mut self, datasets: &[Dataset]) -> ChartResult<()> {
        self.state.calls.borrow_mut().push(LibraryCall::SetData {
            lens: datasets.iter().map(|dataset| dataset.samples.len()).collect(),
        });
        if self.state.fail_set_data.get() {
            return Err(ChartError::InvalidData("dataset rejected".to_owned()));
        }
        self.data = datasets.to_vec();
        Ok(())
    }

    fn redraw(&mut self, mode: RedrawMode) -> ChartResult<()> {
        self.state.calls.borrow_mut().push(LibraryCall::Redraw(mode));
        if let Some(hook) = self.state.on_redraw.borrow().as_ref() {
            hook();
        }
        if self.state.fail_redraw.get() {
            return Err(ChartError::RenderFailure("redraw failed".to_owned()));
        }
        self.state.shown.replace(Some(self.data.clone()));
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) -> ChartResult<()> {
        self.state.calls.borrow_mut().push(LibraryCall::Resize {
            width: viewport.width,
            height: viewport.height,
        });
        Ok(())
    }

    fn destroy(&mut self) {
        self.state.calls.borrow_mut().push(LibraryCall::Destroy);
    }
}

pub fn fast_layout() -> LayoutReadyOptions {
    LayoutReadyOptions::new(10, 5, 100)
}

pub fn controller(
    config: LifecycleConfig,
) -> (ChartLifecycleController<RecordingBackend>, RecordingBackend) {
    let backend = RecordingBackend::default();
    let controller = ChartLifecycleController::with_tokio(backend.clone(), config)
        .expect("controller config is valid");
    (controller, backend)
}

/// Tokio runtime whose next tick is one display frame away, so an apply
/// stays in flight for a known span of (paused) time.
pub struct FrameRuntime {
    pub frame: Duration,
}

impl HostRuntime for FrameRuntime {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        TokioRuntime.spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        TokioRuntime.sleep(duration)
    }

    fn next_tick(&self) -> LocalBoxFuture<'static, ()> {
        TokioRuntime.sleep(self.frame)
    }
}

pub fn framed_controller(
    config: LifecycleConfig,
    frame: Duration,
) -> (ChartLifecycleController<RecordingBackend>, RecordingBackend) {
    let backend = RecordingBackend::default();
    let controller =
        ChartLifecycleController::new(backend.clone(), Rc::new(FrameRuntime { frame }), config)
            .expect("controller config is valid");
    (controller, backend)
}

pub fn series(values: &[f64]) -> Vec<SeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| SeriesPoint::new(index as i64 * 60_000, value))
        .collect()
}

/// Provider that replays scripted responses, each after its own delay.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: RefCell<VecDeque<(Duration, Result<Vec<SeriesPoint>, ProviderError>)>>,
    fallback: RefCell<Vec<SeriesPoint>>,
    queries: RefCell<Vec<SeriesQuery>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, delay: Duration, response: Result<Vec<SeriesPoint>, ProviderError>) -> Self {
        self.responses.borrow_mut().push_back((delay, response));
        self
    }

    /// Returned immediately once the script is exhausted.
    pub fn with_fallback(self, fallback: Vec<SeriesPoint>) -> Self {
        self.fallback.replace(fallback);
        self
    }

    pub fn queries(&self) -> Vec<SeriesQuery> {
        self.queries.borrow().clone()
    }

    pub fn fetches(&self) -> usize {
        self.queries.borrow().len()
    }
}

impl SeriesProvider for ScriptedProvider {
    fn fetch<'a>(
        &'a self,
        query: &'a SeriesQuery,
    ) -> LocalBoxFuture<'a, Result<Vec<SeriesPoint>, ProviderError>> {
        self.queries.borrow_mut().push(query.clone());
        let scripted = self.responses.borrow_mut().pop_front();
        Box::pin(async move {
            match scripted {
                Some((delay, response)) => {
                    tokio::time::sleep(delay).await;
                    response
                }
                None => Ok(self.fallback.borrow().clone()),
            }
        })
    }
}
