use std::rc::Rc;

use futures::StreamExt;
use futures::channel::mpsc;
use futures::future::{Either, LocalBoxFuture, select};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::CanvasBox;
use crate::runtime::HostRuntime;

use super::canvas::ChartCanvas;
use super::config::{LayoutReadyOptions, LayoutStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutOutcome {
    /// The canvas reached the minimum width.
    Ready,
    /// The attempt budget ran out first.
    Exhausted,
    /// The canvas left the host tree while waiting.
    Detached,
}

/// Result of one layout-ready wait. Never an error: callers decide whether a
/// non-ready canvas is good enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutReadiness {
    pub outcome: LayoutOutcome,
    /// Delays (polling) or layout notifications (signal) observed before the
    /// wait finished.
    pub retries: u32,
    pub last_box: Option<CanvasBox>,
}

impl LayoutReadiness {
    fn new(outcome: LayoutOutcome, retries: u32, last_box: Option<CanvasBox>) -> Self {
        Self {
            outcome,
            retries,
            last_box,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.outcome == LayoutOutcome::Ready
    }
}

/// Strategy that decides when a canvas has been laid out.
pub trait LayoutProbe {
    fn wait_until_ready<'a>(
        &'a self,
        canvas: &'a dyn ChartCanvas,
        options: LayoutReadyOptions,
    ) -> LocalBoxFuture<'a, LayoutReadiness>;
}

/// Re-measures the canvas every `delay_ms`, at most `max_attempts` times.
pub struct PollingProbe {
    runtime: Rc<dyn HostRuntime>,
}

impl PollingProbe {
    #[must_use]
    pub fn new(runtime: Rc<dyn HostRuntime>) -> Self {
        Self { runtime }
    }
}

impl LayoutProbe for PollingProbe {
    fn wait_until_ready<'a>(
        &'a self,
        canvas: &'a dyn ChartCanvas,
        options: LayoutReadyOptions,
    ) -> LocalBoxFuture<'a, LayoutReadiness> {
        Box::pin(async move {
            let mut retries = 0_u32;
            loop {
                let Some(current) = canvas.measure() else {
                    return LayoutReadiness::new(LayoutOutcome::Detached, retries, None);
                };
                if current.width >= options.min_width_px {
                    return LayoutReadiness::new(LayoutOutcome::Ready, retries, Some(current));
                }
                if retries.saturating_add(1) >= options.max_attempts {
                    return LayoutReadiness::new(LayoutOutcome::Exhausted, retries, Some(current));
                }
                trace!(attempt = retries + 1, width = current.width, "canvas not laid out yet");
                self.runtime.sleep(options.delay()).await;
                retries += 1;
            }
        })
    }
}

/// Waits for the canvas' own layout notifications instead of polling, with the
/// same total time budget as [`PollingProbe`].
///
/// Falls back to polling when the canvas cannot be observed.
pub struct SignalProbe {
    runtime: Rc<dyn HostRuntime>,
}

impl SignalProbe {
    #[must_use]
    pub fn new(runtime: Rc<dyn HostRuntime>) -> Self {
        Self { runtime }
    }
}

impl LayoutProbe for SignalProbe {
    fn wait_until_ready<'a>(
        &'a self,
        canvas: &'a dyn ChartCanvas,
        options: LayoutReadyOptions,
    ) -> LocalBoxFuture<'a, LayoutReadiness> {
        Box::pin(async move {
            match canvas.measure() {
                None => return LayoutReadiness::new(LayoutOutcome::Detached, 0, None),
                Some(current) if current.width >= options.min_width_px => {
                    return LayoutReadiness::new(LayoutOutcome::Ready, 0, Some(current));
                }
                Some(_) => {}
            }

            let (sender, mut changes) = mpsc::unbounded::<CanvasBox>();
            let subscription = canvas.observe_layout(Rc::new(move |changed: CanvasBox| {
                let _ = sender.unbounded_send(changed);
            }));
            let mut subscription = match subscription {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(error = %err, "layout signal unavailable; polling instead");
                    return PollingProbe::new(Rc::clone(&self.runtime))
                        .wait_until_ready(canvas, options)
                        .await;
                }
            };

            let mut deadline = self.runtime.sleep(options.budget());
            let mut signals = 0_u32;
            let readiness = loop {
                match select(changes.next(), &mut deadline).await {
                    Either::Left((Some(changed), _)) => {
                        signals = signals.saturating_add(1);
                        if changed.width >= options.min_width_px {
                            break LayoutReadiness::new(LayoutOutcome::Ready, signals, Some(changed));
                        }
                    }
                    Either::Left((None, _)) | Either::Right(((), _)) => {
                        // Budget spent or subscription dropped by the canvas:
                        // one last measurement decides.
                        break match canvas.measure() {
                            None => LayoutReadiness::new(LayoutOutcome::Detached, signals, None),
                            Some(current) if current.width >= options.min_width_px => {
                                LayoutReadiness::new(LayoutOutcome::Ready, signals, Some(current))
                            }
                            Some(current) => {
                                LayoutReadiness::new(LayoutOutcome::Exhausted, signals, Some(current))
                            }
                        };
                    }
                }
            };
            subscription.release();
            readiness
        })
    }
}

/// Delays chart construction until the host has laid out the canvas.
pub struct LayoutReadyGate {
    probe: Box<dyn LayoutProbe>,
    options: LayoutReadyOptions,
}

impl LayoutReadyGate {
    #[must_use]
    pub fn new(probe: Box<dyn LayoutProbe>, options: LayoutReadyOptions) -> Self {
        Self { probe, options }
    }

    #[must_use]
    pub fn polling(runtime: Rc<dyn HostRuntime>, options: LayoutReadyOptions) -> Self {
        Self::new(Box::new(PollingProbe::new(runtime)), options)
    }

    #[must_use]
    pub fn signal(runtime: Rc<dyn HostRuntime>, options: LayoutReadyOptions) -> Self {
        Self::new(Box::new(SignalProbe::new(runtime)), options)
    }

    #[must_use]
    pub fn for_strategy(
        strategy: LayoutStrategy,
        runtime: Rc<dyn HostRuntime>,
        options: LayoutReadyOptions,
    ) -> Self {
        match strategy {
            LayoutStrategy::Polling => Self::polling(runtime, options),
            LayoutStrategy::Signal => Self::signal(runtime, options),
        }
    }

    #[must_use]
    pub fn options(&self) -> LayoutReadyOptions {
        self.options
    }

    pub async fn wait_until_ready(&self, canvas: &dyn ChartCanvas) -> LayoutReadiness {
        self.wait_until_ready_with(canvas, self.options).await
    }

    /// Waits with per-call options instead of the gate's defaults.
    pub async fn wait_until_ready_with(
        &self,
        canvas: &dyn ChartCanvas,
        options: LayoutReadyOptions,
    ) -> LayoutReadiness {
        let readiness = self.probe.wait_until_ready(canvas, options).await;
        match readiness.outcome {
            LayoutOutcome::Ready => {
                debug!(retries = readiness.retries, "canvas laid out");
            }
            LayoutOutcome::Exhausted => {
                warn!(
                    retries = readiness.retries,
                    min_width_px = options.min_width_px,
                    "canvas never reached minimum width"
                );
            }
            LayoutOutcome::Detached => {
                debug!(retries = readiness.retries, "canvas detached while waiting for layout");
            }
        }
        readiness
    }
}
