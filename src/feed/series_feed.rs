use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::core::ChartId;
use crate::error::{ChartError, ChartResult};
use crate::library::ChartBackend;
use crate::lifecycle::{ApplyOutcome, ChartLifecycleController};
use crate::runtime::TaskHandle;

use super::provider::{SeriesProvider, SeriesQuery};

struct FeedShared<B: ChartBackend + 'static, P> {
    controller: Rc<ChartLifecycleController<B>>,
    chart_id: ChartId,
    provider: P,
    query: RefCell<SeriesQuery>,
    /// Bumped on every query change; responses for older values are stale.
    generation: Cell<u64>,
    last_outcome: Cell<Option<ApplyOutcome>>,
}

impl<B: ChartBackend + 'static, P: SeriesProvider> FeedShared<B, P> {
    async fn refresh(&self) -> ChartResult<ApplyOutcome> {
        self.controller.ensure_accepts_updates(&self.chart_id)?;
        let generation = self.generation.get();
        let query = self.query.borrow().clone();
        let fetched = self.provider.fetch(&query).await;

        let outcome = if self.generation.get() != generation {
            debug!(chart_id = %self.chart_id, %query, "discarding response for superseded query");
            ApplyOutcome::Stale
        } else {
            match fetched {
                Ok(series) => self.controller.apply(&self.chart_id, series).await?,
                Err(err) => {
                    warn!(chart_id = %self.chart_id, %query, error = %err, "series fetch failed; no data this cycle");
                    ApplyOutcome::NoData
                }
            }
        };
        self.last_outcome.set(Some(outcome));
        Ok(outcome)
    }
}

/// Drives one mounted chart from a [`SeriesProvider`].
///
/// Refreshes happen on a poll timer and whenever the query changes. A
/// response that arrives after a newer query was set is dropped, so a slow
/// request can never overwrite fresher data.
pub struct SeriesFeed<B: ChartBackend + 'static, P: SeriesProvider + 'static> {
    shared: Rc<FeedShared<B, P>>,
    poll_task: RefCell<Option<TaskHandle>>,
    query_task: RefCell<Option<TaskHandle>>,
}

impl<B: ChartBackend + 'static, P: SeriesProvider + 'static> SeriesFeed<B, P> {
    #[must_use]
    pub fn new(
        controller: Rc<ChartLifecycleController<B>>,
        chart_id: ChartId,
        provider: P,
        query: SeriesQuery,
    ) -> Self {
        Self {
            shared: Rc::new(FeedShared {
                controller,
                chart_id,
                provider,
                query: RefCell::new(query),
                generation: Cell::new(0),
                last_outcome: Cell::new(None),
            }),
            poll_task: RefCell::new(None),
            query_task: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn chart_id(&self) -> &ChartId {
        &self.shared.chart_id
    }

    #[must_use]
    pub fn query(&self) -> SeriesQuery {
        self.shared.query.borrow().clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation.get()
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<ApplyOutcome> {
        self.shared.last_outcome.get()
    }

    /// Fetches with the current query and applies the result.
    pub async fn refresh_now(&self) -> ChartResult<ApplyOutcome> {
        self.shared.refresh().await
    }

    /// Refreshes now and then every `poll_interval` until stopped or until the
    /// chart is unmounted.
    pub fn start(&self, poll_interval: Duration) {
        let shared = Rc::clone(&self.shared);
        let runtime = self.shared.controller.runtime();
        let sleeper = Rc::clone(&runtime);
        let task = runtime.spawn_cancellable(Box::pin(async move {
            loop {
                match shared.refresh().await {
                    Ok(outcome) => trace!(chart_id = %shared.chart_id, ?outcome, "poll refresh"),
                    Err(ChartError::ChartDestroyed { .. } | ChartError::UnknownChart { .. }) => {
                        debug!(chart_id = %shared.chart_id, "chart gone; stopping feed");
                        break;
                    }
                    Err(err) => {
                        warn!(chart_id = %shared.chart_id, error = %err, "poll refresh failed");
                    }
                }
                sleeper.sleep(poll_interval).await;
            }
        }));
        if let Some(previous) = self.poll_task.replace(Some(task)) {
            previous.cancel();
        }
    }

    /// Filter change: swaps the query and refreshes right away. In-flight
    /// responses for the previous query become stale.
    pub fn set_query(&self, query: SeriesQuery) {
        if *self.shared.query.borrow() == query {
            return;
        }
        self.shared.generation.set(self.shared.generation.get() + 1);
        debug!(chart_id = %self.shared.chart_id, %query, "series query changed");
        self.shared.query.replace(query);

        let shared = Rc::clone(&self.shared);
        let task = self
            .shared
            .controller
            .runtime()
            .spawn_cancellable(Box::pin(async move {
                if let Err(err) = shared.refresh().await {
                    debug!(chart_id = %shared.chart_id, error = %err, "refresh after query change failed");
                }
            }));
        if let Some(previous) = self.query_task.replace(Some(task)) {
            previous.cancel();
        }
    }

    pub fn stop(&self) {
        for slot in [&self.poll_task, &self.query_task] {
            if let Some(task) = slot.borrow_mut().take() {
                task.cancel();
            }
        }
    }
}

impl<B: ChartBackend + 'static, P: SeriesProvider + 'static> Drop for SeriesFeed<B, P> {
    fn drop(&mut self) {
        self.stop();
    }
}
