use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::SeriesPoint;

/// Filter a panel fetches its series with.
///
/// Values are opaque to the lifecycle layer; providers interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesQuery {
    pub symbol: String,
    pub exchange: String,
    pub interval: String,
    pub range: String,
}

impl SeriesQuery {
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        interval: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            interval: interval.into(),
            range: range.into(),
        }
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }
}

impl fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} {}/{}",
            self.symbol, self.exchange, self.interval, self.range
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}")]
    Status { status: u16 },

    #[error("failed to decode series: {0}")]
    Decode(String),
}

/// Upstream source of time-series records.
///
/// Any failure means "no data this cycle"; callers never retry on their own.
pub trait SeriesProvider {
    fn fetch<'a>(
        &'a self,
        query: &'a SeriesQuery,
    ) -> LocalBoxFuture<'a, Result<Vec<SeriesPoint>, ProviderError>>;
}

impl<P: SeriesProvider + ?Sized> SeriesProvider for Rc<P> {
    fn fetch<'a>(
        &'a self,
        query: &'a SeriesQuery,
    ) -> LocalBoxFuture<'a, Result<Vec<SeriesPoint>, ProviderError>> {
        (**self).fetch(query)
    }
}

/// Provider over a JSON payload source, e.g. an HTTP client the host owns.
///
/// The closure returns the raw body for a query; records are parsed with the
/// same field aliases as [`SeriesPoint::parse_json_array`].
pub struct JsonSeriesProvider<F> {
    load: F,
}

impl<F> JsonSeriesProvider<F>
where
    F: Fn(&SeriesQuery) -> LocalBoxFuture<'static, Result<String, ProviderError>>,
{
    #[must_use]
    pub fn new(load: F) -> Self {
        Self { load }
    }
}

impl<F> SeriesProvider for JsonSeriesProvider<F>
where
    F: Fn(&SeriesQuery) -> LocalBoxFuture<'static, Result<String, ProviderError>>,
{
    fn fetch<'a>(
        &'a self,
        query: &'a SeriesQuery,
    ) -> LocalBoxFuture<'a, Result<Vec<SeriesPoint>, ProviderError>> {
        let body = (self.load)(query);
        Box::pin(async move {
            let body = body.await?;
            SeriesPoint::parse_json_array(&body).map_err(|err| ProviderError::Decode(err.to_string()))
        })
    }
}
