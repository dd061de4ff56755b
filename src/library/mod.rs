//! Chart library seam.
//!
//! The lifecycle layer treats the chart library as a black box behind two
//! traits: a [`ChartBackend`] that constructs instances for a canvas, and the
//! [`ChartInstance`] it returns. [`SeriesChart`] is the built-in
//! implementation on top of the crate's `Renderer` backends.

mod series_chart;

pub use series_chart::{SeriesChart, SeriesChartBackend};

use serde::{Deserialize, Serialize};

use crate::core::{SeriesField, SeriesPoint, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::lifecycle::ChartCanvas;

/// How the library should repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedrawMode {
    /// Repaint immediately without transition effects.
    #[default]
    Immediate,
    /// Let the library animate towards the new data.
    Animated,
}

/// Binds one dataset of the chart to a field of the incoming records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetBinding {
    pub label: String,
    pub field: SeriesField,
}

impl DatasetBinding {
    #[must_use]
    pub fn new(label: impl Into<String>, field: SeriesField) -> Self {
        Self {
            label: label.into(),
            field,
        }
    }
}

/// One bound data array as handed to the library.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    /// `(timestamp_ms, value)` pairs, ascending by timestamp.
    pub samples: Vec<(i64, f64)>,
}

impl Dataset {
    /// Extracts the bound field from canonical records; records without it
    /// are skipped.
    #[must_use]
    pub fn bind(binding: &DatasetBinding, series: &[SeriesPoint]) -> Self {
        Self {
            label: binding.label.clone(),
            samples: series
                .iter()
                .filter_map(|point| point.field(binding.field).map(|v| (point.timestamp, v)))
                .collect(),
        }
    }
}

/// Initial configuration passed to `ChartBackend::construct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_bindings")]
    pub bindings: Vec<DatasetBinding>,
    /// Mode used for redraws that follow a data update.
    #[serde(default)]
    pub update_mode: RedrawMode,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bindings: default_bindings(),
            update_mode: RedrawMode::default(),
        }
    }
}

impl ChartConfig {
    #[must_use]
    pub fn with_bindings(mut self, bindings: Vec<DatasetBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_update_mode(mut self, mode: RedrawMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.bindings.is_empty() {
            return Err(ChartError::InvalidConfig(
                "chart config needs at least one dataset binding".to_owned(),
            ));
        }
        if self.bindings.iter().any(|binding| binding.label.is_empty()) {
            return Err(ChartError::InvalidConfig(
                "dataset binding labels must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_datasets(&self, series: &[SeriesPoint]) -> Vec<Dataset> {
        self.bindings
            .iter()
            .map(|binding| Dataset::bind(binding, series))
            .collect()
    }
}

fn default_bindings() -> Vec<DatasetBinding> {
    vec![DatasetBinding::new("value", SeriesField::Value)]
}

/// Factory side of the chart library.
pub trait ChartBackend {
    type Canvas: ChartCanvas + 'static;
    type Instance: ChartInstance;

    /// Builds a library instance drawing into `canvas` at `viewport`.
    fn construct(
        &self,
        canvas: &Self::Canvas,
        config: &ChartConfig,
        viewport: Viewport,
    ) -> ChartResult<Self::Instance>;
}

/// A live chart-library instance.
///
/// Instances are owned exclusively by `ChartHost`; nothing else calls these
/// methods.
pub trait ChartInstance {
    /// Replaces every bound data array. Must not repaint on its own.
    fn set_data(&mut self, datasets: &[Dataset]) -> ChartResult<()>;

    fn redraw(&mut self, mode: RedrawMode) -> ChartResult<()>;

    /// Adopts a new pixel size and repaints.
    fn resize(&mut self, viewport: Viewport) -> ChartResult<()>;

    /// Releases library resources. Called exactly once.
    fn destroy(&mut self);
}
