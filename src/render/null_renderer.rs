use crate::error::ChartResult;
use crate::render::{RenderFrame, Renderer};

/// Renderer for headless charts and tests.
///
/// Frames are still validated so invalid geometry fails the same way it would
/// on a real backend.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames_rendered: usize,
    pub last_line_count: usize,
    pub last_frame: Option<RenderFrame>,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        self.frames_rendered += 1;
        self.last_line_count = frame.lines.len();
        self.last_frame = Some(frame.clone());
        Ok(())
    }
}
