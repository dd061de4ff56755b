use serde::{Deserialize, Serialize};

/// Per-chart lifecycle state.
///
/// `Unmounted -> AwaitingLayout -> Initialized -> [Updating]* -> Destroyed`.
/// `Updating` is re-entered on every apply; `Destroyed` is terminal. A mount
/// whose canvas never became usable falls back from `AwaitingLayout` to
/// `Unmounted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPhase {
    Unmounted,
    AwaitingLayout,
    Initialized,
    Updating,
    Destroyed,
}

impl ChartPhase {
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ChartPhase::{AwaitingLayout, Destroyed, Initialized, Unmounted, Updating};
        matches!(
            (self, next),
            (Unmounted, AwaitingLayout)
                | (AwaitingLayout, Initialized | Unmounted | Destroyed)
                | (Initialized, Updating | Destroyed)
                | (Updating, Initialized | Destroyed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Destroyed
    }

    /// Whether a chart in this phase owns a live library instance.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Initialized | Self::Updating)
    }
}
