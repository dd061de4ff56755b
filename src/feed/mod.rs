//! Data side of a panel: where series come from and when they are refreshed.

mod provider;
mod series_feed;

pub use provider::{JsonSeriesProvider, ProviderError, SeriesProvider, SeriesQuery};
pub use series_feed::SeriesFeed;
