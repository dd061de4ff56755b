//! Local executor seam.
//!
//! The lifecycle layer never names an executor directly. Everything it needs
//! from the host event loop (spawning `!Send` tasks, timers, yielding one
//! tick) goes through [`HostRuntime`], so the same controller runs on a tokio
//! `LocalSet` in tests and services and on the GLib main context in the GTK
//! adapter.

mod tokio_runtime;

pub use tokio_runtime::TokioRuntime;

use std::time::Duration;

use futures::future::{AbortHandle, LocalBoxFuture, abortable};

pub trait HostRuntime {
    /// Spawns a detached task on the current thread's event loop.
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);

    /// Resolves after `duration` of host time.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    /// Resolves on a later turn of the event loop than the caller's.
    fn next_tick(&self) -> LocalBoxFuture<'static, ()>;

    /// Spawns `task` and returns a handle that can cancel it.
    fn spawn_cancellable(&self, task: LocalBoxFuture<'static, ()>) -> TaskHandle {
        let (task, abort) = abortable(task);
        self.spawn_local(Box::pin(async move {
            let _ = task.await;
        }));
        TaskHandle { abort }
    }
}

/// Cancellation handle for a task started with [`HostRuntime::spawn_cancellable`].
///
/// Dropping the handle leaves the task running.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }
}
