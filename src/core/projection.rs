use serde::{Deserialize, Serialize};

use crate::core::{LinearScale, Viewport};
use crate::error::{ChartError, ChartResult};

/// Projected line segment in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Shared time/value domain of every dataset bound to one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesDomain {
    pub time: LinearScale,
    pub value: LinearScale,
}

impl SeriesDomain {
    /// Fits a domain around `(timestamp_ms, value)` samples.
    ///
    /// Returns `None` when there is nothing to fit. A single timestamp is
    /// widened by one second, a flat value range by at least one unit.
    pub fn fit<'a>(
        samples: impl IntoIterator<Item = &'a (i64, f64)>,
    ) -> ChartResult<Option<Self>> {
        let mut bounds: Option<(i64, i64, f64, f64)> = None;
        for &(time, value) in samples {
            bounds = Some(match bounds {
                None => (time, time, value, value),
                Some((t0, t1, v0, v1)) => (t0.min(time), t1.max(time), v0.min(value), v1.max(value)),
            });
        }

        let Some((t0, t1, v0, v1)) = bounds else {
            return Ok(None);
        };
        Ok(Some(Self {
            time: LinearScale::covering(t0 as f64, t1 as f64, 1_000.0)?,
            value: LinearScale::covering(v0, v1, 1.0)?,
        }))
    }
}

/// Projects `(timestamp_ms, value)` samples into adjacent line segments.
///
/// Deterministic and side-effect free so rendering and tests share the exact
/// same geometry.
pub fn project_line_segments(
    samples: &[(i64, f64)],
    domain: SeriesDomain,
    viewport: Viewport,
) -> ChartResult<Vec<LineSegment>> {
    if !viewport.is_valid() {
        return Err(ChartError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    if samples.len() < 2 {
        return Ok(Vec::new());
    }

    let mut mapped = Vec::with_capacity(samples.len());
    for &(time, value) in samples {
        let x = domain.time.to_pixel(time as f64, viewport.width)?;
        let y = domain.value.to_pixel_inverted(value, viewport.height)?;
        mapped.push((x, y));
    }

    Ok(mapped
        .windows(2)
        .map(|pair| LineSegment {
            x1: pair[0].0,
            y1: pair[0].1,
            x2: pair[1].0,
            y2: pair[1].1,
        })
        .collect())
}
