pub mod chart_id;
pub mod primitives;
pub mod projection;
pub mod scale;
pub mod series;
pub mod types;

pub use chart_id::ChartId;
pub use projection::{LineSegment, SeriesDomain, project_line_segments};
pub use scale::LinearScale;
pub use series::{SeriesAux, SeriesField, SeriesPoint, canonicalize_series};
pub use types::{CanvasBox, Viewport};
