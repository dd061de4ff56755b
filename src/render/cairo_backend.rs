use cairo::{Context, Format, ImageSurface};

use crate::error::{ChartError, ChartResult};
use crate::render::{Color, RenderFrame, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CairoRenderStats {
    pub rects_drawn: usize,
    pub lines_drawn: usize,
}

/// Paints `frame` onto an existing Cairo context.
///
/// Used directly by widget draw callbacks and by the offscreen
/// [`CairoRenderer`].
pub fn paint_frame(
    context: &Context,
    frame: &RenderFrame,
    clear_color: Color,
) -> ChartResult<CairoRenderStats> {
    frame.validate()?;
    clear_color.validate()?;

    apply_color(context, clear_color);
    context
        .paint()
        .map_err(|err| map_backend_error("failed to clear surface", err))?;

    let mut stats = CairoRenderStats::default();
    for rect in &frame.rects {
        apply_color(context, rect.fill_color);
        context.rectangle(rect.x, rect.y, rect.width, rect.height);
        context
            .fill()
            .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
        stats.rects_drawn += 1;
    }

    for line in &frame.lines {
        apply_color(context, line.color);
        context.set_line_width(line.stroke_width);
        context.move_to(line.x1, line.y1);
        context.line_to(line.x2, line.y2);
        context
            .stroke()
            .map_err(|err| map_backend_error("failed to stroke line", err))?;
        stats.lines_drawn += 1;
    }

    Ok(stats)
}

/// Offscreen Cairo renderer backed by an ARGB image surface.
#[derive(Debug)]
pub struct CairoRenderer {
    surface: ImageSurface,
    clear_color: Color,
    last_stats: CairoRenderStats,
}

impl CairoRenderer {
    pub fn new(width: i32, height: i32) -> ChartResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(ChartError::InvalidData(
                "cairo surface size must be > 0".to_owned(),
            ));
        }

        let surface = ImageSurface::create(Format::ARgb32, width, height)
            .map_err(|err| map_backend_error("failed to create cairo surface", err))?;
        Ok(Self {
            surface,
            clear_color: Color::rgb(1.0, 1.0, 1.0),
            last_stats: CairoRenderStats::default(),
        })
    }

    #[must_use]
    pub fn surface(&self) -> &ImageSurface {
        &self.surface
    }

    pub fn set_clear_color(&mut self, color: Color) -> ChartResult<()> {
        color.validate()?;
        self.clear_color = color;
        Ok(())
    }

    #[must_use]
    pub fn last_stats(&self) -> CairoRenderStats {
        self.last_stats
    }
}

impl Renderer for CairoRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        let viewport = frame.viewport;
        let (surface_width, surface_height) = (self.surface.width(), self.surface.height());
        if i64::from(viewport.width) != i64::from(surface_width)
            || i64::from(viewport.height) != i64::from(surface_height)
        {
            let width = i32::try_from(viewport.width).map_err(|_| {
                ChartError::InvalidViewport {
                    width: viewport.width,
                    height: viewport.height,
                }
            })?;
            let height = i32::try_from(viewport.height).map_err(|_| {
                ChartError::InvalidViewport {
                    width: viewport.width,
                    height: viewport.height,
                }
            })?;
            self.surface = ImageSurface::create(Format::ARgb32, width, height)
                .map_err(|err| map_backend_error("failed to resize cairo surface", err))?;
        }

        let context = Context::new(&self.surface)
            .map_err(|err| map_backend_error("failed to create cairo context", err))?;
        self.last_stats = paint_frame(&context, frame, self.clear_color)?;
        Ok(())
    }
}

fn apply_color(context: &Context, color: Color) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> ChartError {
    ChartError::RenderFailure(format!("{prefix}: {err}"))
}
