use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::core::{CanvasBox, ChartId, SeriesPoint, canonicalize_series};
use crate::error::{ChartError, ChartResult};
use crate::library::{ChartBackend, ChartConfig, ChartInstance, RedrawMode};

use super::ChartCanvas;

/// Registry entry for one chart.
///
/// After `destroy` the entry stays as a tombstone: no instance, no data,
/// `destroyed == true`.
struct ChartRecord<I> {
    instance: Option<I>,
    config: ChartConfig,
    raw: Rc<[SeriesPoint]>,
    size: CanvasBox,
    initialized: bool,
    destroyed: bool,
    render_failures: u32,
}

/// Read-only view of a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRecordView {
    pub id: ChartId,
    pub size: CanvasBox,
    pub initialized: bool,
    pub destroyed: bool,
    pub render_failures: u32,
    /// Last dataset the library accepted, canonicalized.
    pub raw: Rc<[SeriesPoint]>,
}

/// Out-of-band registry of live chart-library instances.
///
/// Host UI state holds `ChartId`s only. Every call into a library instance
/// goes through this type, so instances are never reachable from anything the
/// UI observes.
pub struct ChartHost<B: ChartBackend> {
    backend: B,
    records: RefCell<IndexMap<ChartId, ChartRecord<B::Instance>>>,
}

impl<B: ChartBackend> ChartHost<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            records: RefCell::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Constructs the library instance for `id` on `canvas`.
    ///
    /// Fails with `CanvasUnavailable` when the canvas is gone or has no area;
    /// callers are expected to have waited for layout first.
    pub fn create(
        &self,
        id: &ChartId,
        canvas: &B::Canvas,
        config: &ChartConfig,
    ) -> ChartResult<ChartRecordView> {
        let mut records = self.records_mut()?;
        if let Some(existing) = records.get(id) {
            return Err(if existing.destroyed {
                ChartError::ChartDestroyed { id: id.clone() }
            } else {
                ChartError::DuplicateChart { id: id.clone() }
            });
        }

        let size = canvas
            .measure()
            .filter(|size| size.has_area())
            .ok_or_else(|| ChartError::CanvasUnavailable { id: id.clone() })?;
        let instance = self.backend.construct(canvas, config, size.viewport())?;
        debug!(
            chart_id = %id,
            width = size.width,
            height = size.height,
            "chart instance constructed"
        );

        let record = ChartRecord {
            instance: Some(instance),
            config: config.clone(),
            raw: Rc::from(Vec::new()),
            size,
            initialized: true,
            destroyed: false,
            render_failures: 0,
        };
        let view = view_of(id, &record);
        records.insert(id.clone(), record);
        Ok(view)
    }

    /// Non-reactive lookup.
    #[must_use]
    pub fn get(&self, id: &ChartId) -> Option<ChartRecordView> {
        let records = self.records.try_borrow().ok()?;
        records.get(id).map(|record| view_of(id, record))
    }

    #[must_use]
    pub fn is_live(&self, id: &ChartId) -> bool {
        self.records
            .try_borrow()
            .map(|records| records.get(id).is_some_and(|record| !record.destroyed))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.records
            .try_borrow()
            .map(|records| records.values().filter(|record| !record.destroyed).count())
            .unwrap_or(0)
    }

    /// Binds `series` to the instance's datasets without repainting.
    ///
    /// Returns the number of canonical points bound. On a library error the
    /// previous datasets and raw cache stay in place.
    pub fn apply_dataset(&self, id: &ChartId, series: Vec<SeriesPoint>) -> ChartResult<usize> {
        let mut records = self.records_mut()?;
        let record = live_record(&mut records, id)?;

        let canonical = canonicalize_series(series);
        let datasets = record.config.bind_datasets(&canonical);
        let instance = record
            .instance
            .as_mut()
            .ok_or_else(|| ChartError::ChartDestroyed { id: id.clone() })?;
        if let Err(err) = instance.set_data(&datasets) {
            record.render_failures += 1;
            return Err(err.into_render_failure());
        }

        let count = canonical.len();
        record.raw = Rc::from(canonical);
        trace!(chart_id = %id, points = count, datasets = datasets.len(), "dataset bound");
        Ok(count)
    }

    /// Repaints with the chart's configured update mode.
    pub fn redraw(&self, id: &ChartId) -> ChartResult<()> {
        let mode = {
            let records = self
                .records
                .try_borrow()
                .map_err(|_| reentrant_access())?;
            records
                .get(id)
                .map(|record| record.config.update_mode)
                .unwrap_or_default()
        };
        self.redraw_with(id, mode)
    }

    pub fn redraw_with(&self, id: &ChartId, mode: RedrawMode) -> ChartResult<()> {
        let mut records = self.records_mut()?;
        let record = live_record(&mut records, id)?;
        let instance = record
            .instance
            .as_mut()
            .ok_or_else(|| ChartError::ChartDestroyed { id: id.clone() })?;
        if let Err(err) = instance.redraw(mode) {
            record.render_failures += 1;
            return Err(err.into_render_failure());
        }
        Ok(())
    }

    /// Hands a new container size to the library.
    pub fn resize(&self, id: &ChartId, size: CanvasBox) -> ChartResult<()> {
        let mut records = self.records_mut()?;
        let record = live_record(&mut records, id)?;
        let instance = record
            .instance
            .as_mut()
            .ok_or_else(|| ChartError::ChartDestroyed { id: id.clone() })?;
        if let Err(err) = instance.resize(size.viewport()) {
            record.render_failures += 1;
            return Err(err.into_render_failure());
        }
        record.size = size;
        Ok(())
    }

    /// Disposes the instance and leaves a tombstone. Idempotent.
    ///
    /// Returns `Ok(true)` when an instance was disposed by this call. Fails
    /// without touching the record when called from inside a library
    /// callback, since the registry is borrowed for that call.
    pub fn destroy(&self, id: &ChartId) -> ChartResult<bool> {
        let instance = {
            let mut records = self.records_mut()?;
            let Some(record) = records.get_mut(id) else {
                return Ok(false);
            };
            if record.destroyed {
                return Ok(false);
            }
            record.destroyed = true;
            record.raw = Rc::from(Vec::new());
            record.instance.take()
        };

        // Disposal runs outside the registry borrow.
        match instance {
            Some(mut instance) => {
                instance.destroy();
                debug!(chart_id = %id, "chart instance destroyed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tooltip lookup: the raw record closest in time to `timestamp`.
    #[must_use]
    pub fn nearest_point(&self, id: &ChartId, timestamp: i64) -> Option<SeriesPoint> {
        let raw = self.get(id)?.raw;
        if raw.is_empty() {
            return None;
        }
        let index = raw.partition_point(|point| point.timestamp < timestamp);
        let candidates = [index.checked_sub(1), (index < raw.len()).then_some(index)];
        candidates
            .into_iter()
            .flatten()
            .min_by_key(|&candidate| raw[candidate].timestamp.abs_diff(timestamp))
            .map(|candidate| raw[candidate].clone())
    }

    pub(crate) fn views(&self) -> Vec<ChartRecordView> {
        self.records
            .try_borrow()
            .map(|records| {
                records
                    .iter()
                    .map(|(id, record)| view_of(id, record))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn records_mut(&self) -> ChartResult<RefMut<'_, IndexMap<ChartId, ChartRecord<B::Instance>>>> {
        self.records.try_borrow_mut().map_err(|_| reentrant_access())
    }
}

fn live_record<'a, I>(
    records: &'a mut IndexMap<ChartId, ChartRecord<I>>,
    id: &ChartId,
) -> ChartResult<&'a mut ChartRecord<I>> {
    let record = records
        .get_mut(id)
        .ok_or_else(|| ChartError::UnknownChart { id: id.clone() })?;
    if record.destroyed {
        return Err(ChartError::ChartDestroyed { id: id.clone() });
    }
    Ok(record)
}

fn view_of<I>(id: &ChartId, record: &ChartRecord<I>) -> ChartRecordView {
    ChartRecordView {
        id: id.clone(),
        size: record.size,
        initialized: record.initialized,
        destroyed: record.destroyed,
        render_failures: record.render_failures,
        raw: Rc::clone(&record.raw),
    }
}

fn reentrant_access() -> ChartError {
    ChartError::RenderFailure("re-entrant chart host access from a library callback".to_owned())
}
