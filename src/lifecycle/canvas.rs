use std::fmt;
use std::rc::Rc;

use crate::core::CanvasBox;
use crate::error::ChartResult;

/// Callback invoked by a canvas whenever its layout box changes.
pub type LayoutObserver = Rc<dyn Fn(CanvasBox)>;

/// Host element a chart draws into.
///
/// Implementations wrap whatever the host toolkit provides (a GTK drawing
/// area, a DOM canvas, a test fake). Both methods are read-only with respect
/// to the chart: they never touch the chart instance.
pub trait ChartCanvas {
    /// Current layout box, or `None` once the element has left the host tree.
    fn measure(&self) -> Option<CanvasBox>;

    /// Subscribes to layout changes (size, shown/hidden).
    ///
    /// The subscription lasts until the returned handle is released or
    /// dropped.
    fn observe_layout(&self, observer: LayoutObserver) -> ChartResult<ObserverHandle>;
}

/// Owns one layout subscription and releases it exactly once.
///
/// Release happens on the first call to [`ObserverHandle::release`] or on
/// drop, whichever comes first.
pub struct ObserverHandle {
    release: Option<Box<dyn FnOnce()>>,
}

impl ObserverHandle {
    #[must_use]
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Handle for canvases that never emit layout changes.
    #[must_use]
    pub fn inert() -> Self {
        Self { release: None }
    }

    /// Releases the subscription. Returns `false` when it was already released.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
