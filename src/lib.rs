//! chart-lifecycle: keeps dashboard chart instances in sync with async data
//! and host layout.
//!
//! Panels own a canvas and a `ChartId`; everything else (waiting for the
//! first layout pass, the out-of-band instance registry, visibility-aware
//! resizing, single-flight dataset updates) lives behind
//! [`ChartLifecycleController`].

pub mod core;
pub mod error;
pub mod extensions;
pub mod feed;
pub mod library;
pub mod lifecycle;
pub mod render;
pub mod runtime;
pub mod telemetry;

#[cfg(feature = "gtk4-adapter")]
pub mod platform_gtk;

pub use crate::core::{ChartId, SeriesPoint};
pub use error::{ChartError, ChartResult};
pub use lifecycle::{ApplyOutcome, ChartLifecycleController, ChartPhase, LifecycleConfig};
