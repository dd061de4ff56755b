//! Optional hooks layered on top of the lifecycle controller.
//!
//! Listeners observe; they never get access to chart instances.

mod listeners;

pub(crate) use listeners::ListenerRegistry;
pub use listeners::{EventLog, LifecycleEvent, LifecycleListener};
