use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Bounds for the layout-ready wait.
///
/// The defaults are empirical and carry no meaning beyond "long enough for a
/// typical first layout pass"; tune them per host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutReadyOptions {
    #[serde(default = "default_min_width_px")]
    pub min_width_px: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for LayoutReadyOptions {
    fn default() -> Self {
        Self {
            min_width_px: default_min_width_px(),
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl LayoutReadyOptions {
    #[must_use]
    pub fn new(min_width_px: u32, max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            min_width_px,
            max_attempts,
            delay_ms,
        }
    }

    #[must_use]
    pub fn delay(self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Total time a wait may take: one delay between consecutive attempts.
    #[must_use]
    pub fn budget(self) -> Duration {
        self.delay()
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }

    pub fn validate(self) -> ChartResult<Self> {
        if self.max_attempts == 0 {
            return Err(ChartError::InvalidConfig(
                "layout max_attempts must be >= 1".to_owned(),
            ));
        }
        if self.min_width_px == 0 {
            return Err(ChartError::InvalidConfig(
                "layout min_width_px must be >= 1".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Which layout-ready strategy the controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Re-measure the canvas at a fixed delay.
    #[default]
    Polling,
    /// Wait for the canvas layout signal, bounded by the same budget.
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeOptions {
    /// Quiet period before a burst of window resizes turns into one pass.
    #[serde(default = "default_window_debounce_ms")]
    pub window_debounce_ms: u64,
    /// Default duration of animated layout transitions (sidebar collapse).
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            window_debounce_ms: default_window_debounce_ms(),
            transition_ms: default_transition_ms(),
        }
    }
}

impl ResizeOptions {
    #[must_use]
    pub fn window_debounce(self) -> Duration {
        Duration::from_millis(self.window_debounce_ms)
    }

    #[must_use]
    pub fn transition(self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

/// What happens to an apply request while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Drop the request; a fresher fetch will supersede it.
    #[default]
    DropWhileBusy,
    /// Park the newest request in a single slot and apply it when the running
    /// one finishes. Older parked requests are replaced.
    CoalesceLatest,
}

/// Tunables of the chart lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub layout: LayoutReadyOptions,
    #[serde(default)]
    pub layout_strategy: LayoutStrategy,
    #[serde(default)]
    pub resize: ResizeOptions,
    #[serde(default)]
    pub update_policy: UpdatePolicy,
}

impl LifecycleConfig {
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutReadyOptions) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_layout_strategy(mut self, strategy: LayoutStrategy) -> Self {
        self.layout_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_resize(mut self, resize: ResizeOptions) -> Self {
        self.resize = resize;
        self
    }

    #[must_use]
    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        self.layout.validate()?;
        Ok(self)
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input).map_err(|e| {
            ChartError::InvalidConfig(format!("failed to parse lifecycle config json: {e}"))
        })?;
        config.validate()
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ChartError::InvalidConfig(format!("failed to serialize lifecycle config: {e}"))
        })
    }
}

fn default_min_width_px() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    10
}

fn default_delay_ms() -> u64 {
    100
}

fn default_window_debounce_ms() -> u64 {
    250
}

fn default_transition_ms() -> u64 {
    300
}
