//! Chart lifecycle: layout gating, the out-of-band instance registry,
//! visibility-aware resizing and single-flight updates, composed by
//! [`ChartLifecycleController`].

mod canvas;
mod config;
mod controller;
mod host;
mod layout_gate;
mod phase;
mod resizer;
mod snapshot;
mod update_gate;

pub use canvas::{ChartCanvas, LayoutObserver, ObserverHandle};
pub use config::{LayoutReadyOptions, LayoutStrategy, LifecycleConfig, ResizeOptions, UpdatePolicy};
pub use controller::{ApplyOutcome, ChartLifecycleController};
pub use host::{ChartHost, ChartRecordView};
pub use layout_gate::{
    LayoutOutcome, LayoutProbe, LayoutReadiness, LayoutReadyGate, PollingProbe, SignalProbe,
};
pub use phase::ChartPhase;
pub use resizer::{ResizeSink, ResizerStats, VisibilityResizer};
pub use snapshot::{ChartSnapshot, LifecycleSnapshot};
pub use update_gate::{PendingGuard, UpdateGate};
