use thiserror::Error;

use crate::core::ChartId;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("canvas for chart `{id}` is missing or has no area")]
    CanvasUnavailable { id: ChartId },

    #[error("chart `{id}` has been destroyed")]
    ChartDestroyed { id: ChartId },

    #[error("chart `{id}` is not registered")]
    UnknownChart { id: ChartId },

    #[error("chart `{id}` is still waiting for layout")]
    NotInitialized { id: ChartId },

    #[error("chart `{id}` is already mounted")]
    DuplicateChart { id: ChartId },

    #[error("render failure: {0}")]
    RenderFailure(String),

    #[error("layout observer unavailable: {0}")]
    ObserverUnavailable(String),

    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ChartError {
    /// Returns `true` for errors raised by the chart library itself.
    ///
    /// These are treated as dropped frames by the lifecycle layer.
    #[must_use]
    pub fn is_render_fault(&self) -> bool {
        matches!(
            self,
            Self::RenderFailure(_) | Self::InvalidViewport { .. } | Self::InvalidData(_)
        )
    }

    pub(crate) fn into_render_failure(self) -> Self {
        match self {
            Self::RenderFailure(_) => self,
            other => Self::RenderFailure(other.to_string()),
        }
    }
}
