//! GTK4 host adapter: drawing areas as chart canvases, the GLib main context
//! as the host runtime, and a renderer that paints through the area's draw
//! function.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;
use smallvec::SmallVec;
use tracing::warn;

use crate::core::{CanvasBox, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::library::SeriesChartBackend;
use crate::lifecycle::{ChartCanvas, LayoutObserver, ObserverHandle};
use crate::render::{Color, RenderFrame, Renderer, paint_frame};
use crate::runtime::HostRuntime;

/// Chart canvas backed by a `gtk::DrawingArea`.
#[derive(Debug, Clone)]
pub struct GtkCanvas {
    area: gtk::DrawingArea,
}

impl GtkCanvas {
    #[must_use]
    pub fn new(area: gtk::DrawingArea) -> Self {
        Self { area }
    }

    #[must_use]
    pub fn area(&self) -> &gtk::DrawingArea {
        &self.area
    }
}

fn measure_area(area: &gtk::DrawingArea) -> Option<CanvasBox> {
    // No root means the widget is not part of a window anymore.
    area.root()?;
    Some(CanvasBox {
        width: u32::try_from(area.width()).unwrap_or(0),
        height: u32::try_from(area.height()).unwrap_or(0),
        displayed: area.is_mapped(),
    })
}

impl ChartCanvas for GtkCanvas {
    fn measure(&self) -> Option<CanvasBox> {
        measure_area(&self.area)
    }

    fn observe_layout(&self, observer: LayoutObserver) -> ChartResult<ObserverHandle> {
        let notify: Rc<dyn Fn(&gtk::DrawingArea)> = Rc::new(move |area| {
            if let Some(current) = measure_area(area) {
                observer(current);
            }
        });

        let mut handlers: SmallVec<[glib::SignalHandlerId; 3]> = SmallVec::new();
        {
            let notify = Rc::clone(&notify);
            handlers.push(self.area.connect_resize(move |area, _, _| notify(area)));
        }
        {
            let notify = Rc::clone(&notify);
            handlers.push(self.area.connect_map(move |area| notify(area)));
        }
        handlers.push(self.area.connect_unmap(move |area| notify(area)));

        let area = self.area.downgrade();
        Ok(ObserverHandle::new(move || {
            let Some(area) = area.upgrade() else {
                return;
            };
            for handler in handlers {
                area.disconnect(handler);
            }
        }))
    }
}

/// [`HostRuntime`] on the default GLib main context.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlibRuntime;

impl HostRuntime for GlibRuntime {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        drop(glib::MainContext::default().spawn_local(task));
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        glib::timeout_future(duration)
    }

    fn next_tick(&self) -> LocalBoxFuture<'static, ()> {
        glib::timeout_future(Duration::ZERO)
    }
}

/// Renderer that hands frames to a drawing area and lets GTK paint them in
/// its draw function.
pub struct GtkFrameRenderer {
    area: gtk::DrawingArea,
    frame: Rc<RefCell<Option<RenderFrame>>>,
}

impl GtkFrameRenderer {
    /// Installs the draw function on `area`, replacing any previous one.
    #[must_use]
    pub fn install(area: &gtk::DrawingArea, clear_color: Color) -> Self {
        let frame: Rc<RefCell<Option<RenderFrame>>> = Rc::new(RefCell::new(None));
        area.set_draw_func({
            let frame = Rc::clone(&frame);
            move |_widget, context, width, height| {
                if width <= 0 || height <= 0 {
                    return;
                }
                let Ok(frame) = frame.try_borrow() else {
                    return;
                };
                let Some(frame) = frame.as_ref() else {
                    return;
                };
                if let Err(err) = paint_frame(context, frame, clear_color) {
                    warn!(error = %err, "chart frame paint failed");
                }
            }
        });
        Self {
            area: area.clone(),
            frame,
        }
    }
}

impl Renderer for GtkFrameRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        let mut current = self.frame.try_borrow_mut().map_err(|_| {
            ChartError::RenderFailure("frame is being painted".to_owned())
        })?;
        *current = Some(frame.clone());
        drop(current);
        self.area.queue_draw();
        Ok(())
    }
}

pub type GtkChartBackend = SeriesChartBackend<GtkCanvas, GtkFrameRenderer>;

/// Backend whose charts paint into their canvas' drawing area.
#[must_use]
pub fn gtk_chart_backend(clear_color: Color) -> GtkChartBackend {
    SeriesChartBackend::with_renderer_factory(move |canvas: &GtkCanvas, _viewport: Viewport| {
        Ok(GtkFrameRenderer::install(canvas.area(), clear_color))
    })
}
