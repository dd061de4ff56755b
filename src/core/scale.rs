use crate::error::{ChartError, ChartResult};

/// Maps a finite domain onto `[0, extent]` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> ChartResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
        })
    }

    /// Builds a scale over `[min, max]`, widening a degenerate domain by
    /// `fallback_half_span` on each side, or by a few ulps of `min` when that
    /// is larger.
    pub fn covering(min: f64, max: f64, fallback_half_span: f64) -> ChartResult<Self> {
        if min == max {
            let half_span = fallback_half_span.max(min.abs() * f64::EPSILON * 4.0);
            return Self::new(min - half_span, max + half_span);
        }
        Self::new(min, max)
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    pub fn to_pixel(self, value: f64, extent: u32) -> ChartResult<f64> {
        if extent == 0 {
            return Err(ChartError::InvalidData(
                "scale extent must be > 0".to_owned(),
            ));
        }
        if !value.is_finite() {
            return Err(ChartError::InvalidData("value must be finite".to_owned()));
        }

        let span = self.domain_end - self.domain_start;
        Ok((value - self.domain_start) / span * f64::from(extent))
    }

    /// Same as [`Self::to_pixel`] with the axis flipped, for values growing upward.
    pub fn to_pixel_inverted(self, value: f64, extent: u32) -> ChartResult<f64> {
        Ok(f64::from(extent) - self.to_pixel(value, extent)?)
    }
}
