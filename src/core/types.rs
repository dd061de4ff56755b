use serde::{Deserialize, Serialize};

/// Pixel size handed to the chart library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Measured layout box of a chart container at one instant.
///
/// `displayed` is `false` when the host hides the container outright
/// (unmapped widget, `display: none`), independent of its last known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasBox {
    pub width: u32,
    pub height: u32,
    pub displayed: bool,
}

impl CanvasBox {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            displayed: true,
        }
    }

    #[must_use]
    pub fn hidden(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            displayed: false,
        }
    }

    #[must_use]
    pub fn has_area(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// A container is visible when it is displayed and laid out with area.
    #[must_use]
    pub fn is_visible(self) -> bool {
        self.displayed && self.has_area()
    }

    #[must_use]
    pub fn viewport(self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}
