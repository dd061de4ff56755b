use serde::{Deserialize, Serialize};

use crate::core::{CanvasBox, ChartId};
use crate::error::{ChartError, ChartResult};

use super::phase::ChartPhase;
use super::resizer::ResizerStats;

/// Point-in-time state of one chart, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub chart_id: ChartId,
    pub phase: ChartPhase,
    pub points: usize,
    pub size: Option<CanvasBox>,
    pub has_instance: bool,
    pub observed: bool,
    pub render_failures: u32,
}

/// Point-in-time state of a whole controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSnapshot {
    pub charts: Vec<ChartSnapshot>,
    pub active_observers: usize,
    pub pending_updates: usize,
    pub resizer: ResizerStats,
}

impl LifecycleSnapshot {
    #[must_use]
    pub fn chart(&self, id: &ChartId) -> Option<&ChartSnapshot> {
        self.charts.iter().find(|chart| &chart.chart_id == id)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize lifecycle snapshot: {e}"))
        })
    }
}
