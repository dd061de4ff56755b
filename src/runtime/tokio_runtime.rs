use std::time::Duration;

use futures::future::LocalBoxFuture;

use super::HostRuntime;

/// [`HostRuntime`] over tokio's single-threaded local tasks.
///
/// Spawning requires a running `tokio::task::LocalSet`; timers follow the
/// tokio clock, so tests can pause and auto-advance it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntime;

impl HostRuntime for TokioRuntime {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        drop(tokio::task::spawn_local(task));
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn next_tick(&self) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::task::yield_now())
    }
}
