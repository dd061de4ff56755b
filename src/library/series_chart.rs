use std::marker::PhantomData;

use tracing::trace;

use crate::core::{SeriesDomain, Viewport, project_line_segments};
use crate::error::{ChartError, ChartResult};
use crate::lifecycle::ChartCanvas;
use crate::render::{Color, LinePrimitive, RectPrimitive, RenderFrame, Renderer};

use super::{ChartBackend, ChartConfig, ChartInstance, Dataset, RedrawMode};

const BACKGROUND: Color = Color::rgb(1.0, 1.0, 1.0);
const PALETTE: [Color; 4] = [
    Color::rgb(0.16, 0.38, 1.0),
    Color::rgb(0.94, 0.33, 0.31),
    Color::rgb(0.15, 0.65, 0.60),
    Color::rgb(0.96, 0.65, 0.14),
];
const STROKE_WIDTH: f64 = 1.5;

/// Built-in line chart: projects every bound dataset over a shared domain and
/// hands the resulting frame to a `Renderer`.
pub struct SeriesChart<R: Renderer> {
    renderer: R,
    viewport: Viewport,
    datasets: Vec<Dataset>,
    redraw_count: usize,
    destroyed: bool,
}

impl<R: Renderer> SeriesChart<R> {
    pub fn new(renderer: R, viewport: Viewport) -> ChartResult<Self> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            renderer,
            viewport,
            datasets: Vec::new(),
            redraw_count: 0,
            destroyed: false,
        })
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn redraw_count(&self) -> usize {
        self.redraw_count
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Builds the frame for the current datasets and viewport.
    pub fn build_frame(&self) -> ChartResult<RenderFrame> {
        let width = f64::from(self.viewport.width);
        let height = f64::from(self.viewport.height);
        let mut frame =
            RenderFrame::new(self.viewport).with_rect(RectPrimitive::new(0.0, 0.0, width, height, BACKGROUND));

        let Some(domain) =
            SeriesDomain::fit(self.datasets.iter().flat_map(|dataset| dataset.samples.iter()))?
        else {
            return Ok(frame);
        };

        for (index, dataset) in self.datasets.iter().enumerate() {
            let color = PALETTE[index % PALETTE.len()];
            for segment in project_line_segments(&dataset.samples, domain, self.viewport)? {
                frame.lines.push(LinePrimitive::new(
                    segment.x1,
                    segment.y1,
                    segment.x2,
                    segment.y2,
                    STROKE_WIDTH,
                    color,
                ));
            }
        }
        Ok(frame)
    }

    fn ensure_live(&self) -> ChartResult<()> {
        if self.destroyed {
            return Err(ChartError::RenderFailure(
                "series chart instance already destroyed".to_owned(),
            ));
        }
        Ok(())
    }
}

impl<R: Renderer> ChartInstance for SeriesChart<R> {
    fn set_data(&mut self, datasets: &[Dataset]) -> ChartResult<()> {
        self.ensure_live()?;
        self.datasets = datasets.to_vec();
        Ok(())
    }

    fn redraw(&mut self, mode: RedrawMode) -> ChartResult<()> {
        self.ensure_live()?;
        let frame = self.build_frame()?;
        trace!(
            ?mode,
            lines = frame.lines.len(),
            width = self.viewport.width,
            height = self.viewport.height,
            "series chart redraw"
        );
        self.renderer.render(&frame)?;
        self.redraw_count += 1;
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) -> ChartResult<()> {
        self.ensure_live()?;
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        self.viewport = viewport;
        self.redraw(RedrawMode::Immediate)
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.datasets.clear();
    }
}

type RendererFactory<C, R> = Box<dyn Fn(&C, Viewport) -> ChartResult<R>>;

/// Backend constructing [`SeriesChart`] instances for canvases of type `C`.
pub struct SeriesChartBackend<C, R> {
    make_renderer: RendererFactory<C, R>,
    _canvas: PhantomData<fn(&C)>,
}

impl<C, R> SeriesChartBackend<C, R> {
    /// Uses `make_renderer` to create one renderer per constructed chart.
    pub fn with_renderer_factory(
        make_renderer: impl Fn(&C, Viewport) -> ChartResult<R> + 'static,
    ) -> Self {
        Self {
            make_renderer: Box::new(make_renderer),
            _canvas: PhantomData,
        }
    }
}

impl<C, R: Renderer + Default> SeriesChartBackend<C, R> {
    /// Backend whose charts use `R::default()`, e.g. `NullRenderer`.
    #[must_use]
    pub fn headless() -> Self {
        Self::with_renderer_factory(|_, _| Ok(R::default()))
    }
}

impl<C: ChartCanvas + 'static, R: Renderer> ChartBackend for SeriesChartBackend<C, R> {
    type Canvas = C;
    type Instance = SeriesChart<R>;

    fn construct(
        &self,
        canvas: &Self::Canvas,
        config: &ChartConfig,
        viewport: Viewport,
    ) -> ChartResult<Self::Instance> {
        config.validate()?;
        let renderer = (self.make_renderer)(canvas, viewport)?;
        SeriesChart::new(renderer, viewport)
    }
}
