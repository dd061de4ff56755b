use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::ChartId;
use crate::error::{ChartError, ChartResult};

/// Lifecycle event stream exposed to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    MountStarted {
        chart_id: ChartId,
    },
    Mounted {
        chart_id: ChartId,
        layout_ready: bool,
        retries: u32,
    },
    MountAbandoned {
        chart_id: ChartId,
        reason: String,
    },
    Applied {
        chart_id: ChartId,
        points: usize,
    },
    UpdateDropped {
        chart_id: ChartId,
    },
    UpdateCoalesced {
        chart_id: ChartId,
    },
    RenderFailed {
        chart_id: ChartId,
        error: String,
    },
    Resized {
        chart_id: ChartId,
        width: u32,
        height: u32,
    },
    Unmounted {
        chart_id: ChartId,
    },
}

impl LifecycleEvent {
    #[must_use]
    pub fn chart_id(&self) -> &ChartId {
        match self {
            Self::MountStarted { chart_id }
            | Self::Mounted { chart_id, .. }
            | Self::MountAbandoned { chart_id, .. }
            | Self::Applied { chart_id, .. }
            | Self::UpdateDropped { chart_id }
            | Self::UpdateCoalesced { chart_id }
            | Self::RenderFailed { chart_id, .. }
            | Self::Resized { chart_id, .. }
            | Self::Unmounted { chart_id } => chart_id,
        }
    }
}

/// Observer hook for lifecycle events.
///
/// Listeners see events after the corresponding state change is complete and
/// cannot reach chart instances.
pub trait LifecycleListener {
    fn id(&self) -> &str;
    fn on_event(&mut self, event: &LifecycleEvent);
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RefCell<Vec<Box<dyn LifecycleListener>>>,
}

impl ListenerRegistry {
    pub(crate) fn register(&self, listener: Box<dyn LifecycleListener>) -> ChartResult<()> {
        let listener_id = listener.id().to_owned();
        if listener_id.is_empty() {
            return Err(ChartError::InvalidData(
                "listener id must not be empty".to_owned(),
            ));
        }
        let mut listeners = self
            .listeners
            .try_borrow_mut()
            .map_err(|_| ChartError::InvalidData("listeners are being notified".to_owned()))?;
        if listeners.iter().any(|entry| entry.id() == listener_id) {
            return Err(ChartError::InvalidData(format!(
                "listener with id `{listener_id}` is already registered"
            )));
        }
        listeners.push(listener);
        Ok(())
    }

    pub(crate) fn unregister(&self, listener_id: &str) -> bool {
        let Ok(mut listeners) = self.listeners.try_borrow_mut() else {
            return false;
        };
        match listeners.iter().position(|entry| entry.id() == listener_id) {
            Some(position) => {
                listeners.remove(position);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .try_borrow()
            .map_or(0, |listeners| listeners.len())
    }

    pub(crate) fn emit(&self, event: LifecycleEvent) {
        // Events raised from inside a listener callback are dropped.
        let Ok(mut listeners) = self.listeners.try_borrow_mut() else {
            warn!(chart_id = %event.chart_id(), ?event, "nested lifecycle event not delivered");
            return;
        };
        for listener in listeners.iter_mut() {
            listener.on_event(&event);
        }
    }
}

/// Listener that keeps every event it receives. Handy for dashboards that
/// show a per-panel activity log, and for tests.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    id: String,
    events: Rc<RefCell<Vec<LifecycleEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            events: Rc::default(),
        }
    }

    /// Events recorded so far, shared with every clone of this log.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn count_matching(&self, predicate: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }
}

impl LifecycleListener for EventLog {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_event(&mut self, event: &LifecycleEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
