use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

static NEXT_CHART_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque key naming one chart instance for its lifetime.
///
/// Host UI state stores this key, never the chart instance itself. Cloning is
/// cheap so panels can hand it to callbacks freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartId(SmolStr);

impl ChartId {
    /// Wraps a caller-chosen identifier.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(SmolStr::new(raw))
    }

    /// Generates a process-unique identifier such as `funding-rate-12`.
    ///
    /// The sequence is shared by every prefix, so two panels never receive the
    /// same key even when they use the same prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let seq = NEXT_CHART_SEQ.fetch_add(1, Ordering::Relaxed);
        let prefix = if prefix.is_empty() { "chart" } else { prefix };
        Self(format_smolstr!("{prefix}-{seq}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChartId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
