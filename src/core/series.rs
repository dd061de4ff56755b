use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::primitives::{datetime_to_epoch_millis, decimal_to_f64};
use crate::error::{ChartError, ChartResult};

/// Optional per-record fields carried by some panels.
///
/// Liquidation panels tag the margin type; OHLC-style panels carry the four
/// price components. All of them are optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesAux {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "marginType")]
    pub margin_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "o")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "h")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "l")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "c")]
    pub close: Option<f64>,
}

/// One time-value record as delivered by a series provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Epoch milliseconds.
    #[serde(alias = "time", alias = "t")]
    pub timestamp: i64,
    #[serde(alias = "v")]
    pub value: f64,
    #[serde(flatten)]
    pub aux: SeriesAux,
}

impl SeriesPoint {
    #[must_use]
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            aux: SeriesAux::default(),
        }
    }

    #[must_use]
    pub fn with_aux(mut self, aux: SeriesAux) -> Self {
        self.aux = aux;
        self
    }

    pub fn from_decimal_time(time: DateTime<Utc>, value: Decimal) -> ChartResult<Self> {
        Ok(Self::new(
            datetime_to_epoch_millis(time),
            decimal_to_f64(value, "value")?,
        ))
    }

    /// Returns the bound field, or `None` when this record does not carry it.
    #[must_use]
    pub fn field(&self, field: SeriesField) -> Option<f64> {
        match field {
            SeriesField::Value => Some(self.value),
            SeriesField::Open => self.aux.open,
            SeriesField::High => self.aux.high,
            SeriesField::Low => self.aux.low,
            SeriesField::Close => self.aux.close,
        }
    }

    fn is_finite(&self) -> bool {
        self.value.is_finite()
            && [self.aux.open, self.aux.high, self.aux.low, self.aux.close]
                .into_iter()
                .flatten()
                .all(f64::is_finite)
    }

    /// Parses a JSON array of records.
    pub fn parse_json_array(input: &str) -> ChartResult<Vec<Self>> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse series json: {e}")))
    }
}

/// Record field a dataset is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesField {
    Value,
    Open,
    High,
    Low,
    Close,
}

/// Sorts by timestamp, drops non-finite records and collapses duplicate
/// timestamps last-wins.
///
/// Sorting is stable, so "last" means last in upstream order and the output is
/// deterministic for any input.
#[must_use]
pub fn canonicalize_series(mut points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
    let original_len = points.len();
    points.retain(SeriesPoint::is_finite);
    points.sort_by_key(|point| point.timestamp);

    let mut deduped: Vec<SeriesPoint> = Vec::with_capacity(points.len());
    let mut duplicate_count = 0_usize;
    for point in points {
        if let Some(last) = deduped.last_mut() {
            if last.timestamp == point.timestamp {
                *last = point;
                duplicate_count += 1;
                continue;
            }
        }
        deduped.push(point);
    }

    let filtered_count = original_len.saturating_sub(deduped.len() + duplicate_count);
    if filtered_count > 0 || duplicate_count > 0 {
        warn!(
            filtered_count,
            duplicate_count,
            canonical_count = deduped.len(),
            "canonicalized series before binding"
        );
    }
    deduped
}
