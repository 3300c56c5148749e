//! Array cropping.
//!
//! Restricts a gridded source to the buffered extent and the requested date
//! window. Only the cropped window is ever read, so memory use follows the
//! window rather than the source file.

use crate::constants::WINDOW_MEMORY_WARN_FRACTION;
use crate::dataset::{GriddedSource, IndexWindow};
use crate::error::{ExtractError, Result};
use crate::models::{BoundingBox, DataAbsent, DateWindow, NoDataReason};
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array3, ArrayView1, s};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Coordinate axes of a source, loaded once per run
#[derive(Debug, Clone)]
pub struct GridAxes {
    pub times: Vec<NaiveDateTime>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl GridAxes {
    /// Load and sanity-check the axes of `source`
    pub fn load(source: &dyn GriddedSource) -> Result<Self> {
        let times = source.times()?;
        let lats = source.latitudes()?;
        let lons = source.longitudes()?;

        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ExtractError::unreadable(
                source.name(),
                "time axis is not in chronological order",
            ));
        }

        Ok(Self { times, lats, lons })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.lats.len(), self.lons.len())
    }
}

/// A dataset window restricted along time, lat and lon
#[derive(Debug, Clone)]
pub struct CroppedGrid {
    pub variable: String,
    pub window: IndexWindow,
    pub times: Vec<NaiveDateTime>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub resolution: f64,
    values: Array3<f64>,
}

impl CroppedGrid {
    pub fn new(
        variable: impl Into<String>,
        window: IndexWindow,
        axes: &GridAxes,
        resolution: f64,
        values: Array3<f64>,
    ) -> Result<Self> {
        let variable = variable.into();
        if values.dim() != window.shape() {
            return Err(ExtractError::unreadable(
                variable.as_str(),
                format!(
                    "read returned shape {:?} for window {:?}",
                    values.dim(),
                    window.shape()
                ),
            ));
        }

        Ok(Self {
            times: axes.times[window.time.clone()].to_vec(),
            lats: axes.lats[window.lat.clone()].to_vec(),
            lons: axes.lons[window.lon.clone()].to_vec(),
            variable,
            window,
            resolution,
            values,
        })
    }

    /// (time, lat, lon) lengths
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    pub fn cell_count(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    /// Centre (lat, lon) of cell (i, j)
    pub fn center(&self, i: usize, j: usize) -> Option<(f64, f64)> {
        Some((*self.lats.get(i)?, *self.lons.get(j)?))
    }

    /// Full chronological series of cell (i, j)
    pub fn series(&self, i: usize, j: usize) -> ArrayView1<'_, f64> {
        self.values.slice(s![.., i, j])
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.times.first().map(|t| t.date())
    }

    /// Cell indices in row-major order (i outer, j inner)
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let nx = self.lons.len();
        (0..self.lats.len())
            .flat_map(|i| (0..nx).map(move |j| (i, j)))
            .collect()
    }
}

/// Result of cropping
#[derive(Debug)]
pub enum CropOutcome {
    Window(CroppedGrid),
    NoData(DataAbsent),
}

/// Crops sources to an extent and date window
#[derive(Debug, Clone)]
pub struct ArrayCropper {
    memory_mb: usize,
}

impl ArrayCropper {
    /// `memory_mb` is the system memory used to flag oversized windows (0 disables)
    pub fn new(memory_mb: usize) -> Self {
        Self { memory_mb }
    }

    /// Compute the index window for `extent` and `dates`
    pub fn window(
        &self,
        axes: &GridAxes,
        extent: &BoundingBox,
        dates: &DateWindow,
    ) -> std::result::Result<IndexWindow, DataAbsent> {
        if dates.is_inverted() {
            return Err(DataAbsent {
                reason: NoDataReason::InvertedDates,
            });
        }

        let time = matching_range(&axes.times, |t| dates.contains(t.date())).ok_or(DataAbsent {
            reason: NoDataReason::OutsideTimeCoverage,
        })?;

        let spatial = DataAbsent {
            reason: NoDataReason::OutsideSpatialExtent,
        };
        let lat = matching_range(&axes.lats, |v| extent.contains_lat(*v)).ok_or(spatial)?;
        let lon = matching_range(&axes.lons, |v| extent.contains_lon(*v)).ok_or(spatial)?;

        Ok(IndexWindow { time, lat, lon })
    }

    /// Read the primary variable over the cropped window
    pub fn crop(
        &self,
        source: &dyn GriddedSource,
        variable: &str,
        axes: &GridAxes,
        extent: &BoundingBox,
        dates: &DateWindow,
        resolution: f64,
    ) -> Result<CropOutcome> {
        let window = match self.window(axes, extent, dates) {
            Ok(window) => window,
            Err(absent) => {
                debug!("{}: {}", source.name(), absent);
                return Ok(CropOutcome::NoData(absent));
            }
        };

        let (nt, ny, nx) = axes.shape();
        let source_mb = (nt * ny * nx * std::mem::size_of::<f64>()) as f64 / (1024.0 * 1024.0);
        let window_mb = window.byte_size() as f64 / (1024.0 * 1024.0);
        info!(
            "Cropping {} to {}: {:.1}MB -> {:.1}MB",
            source.name(),
            extent,
            source_mb,
            window_mb
        );

        if self.memory_mb > 0 && window_mb > self.memory_mb as f64 * WINDOW_MEMORY_WARN_FRACTION {
            warn!(
                "Cropped window of {:.1}MB exceeds half of system memory ({}MB)",
                window_mb, self.memory_mb
            );
        }

        let values = source.read_window(variable, &window)?;
        let grid = CroppedGrid::new(variable, window, axes, resolution, values)?;
        Ok(CropOutcome::Window(grid))
    }
}

/// Smallest index range covering every element that satisfies `keep`.
///
/// On a monotonic axis the matches are contiguous, whichever direction the
/// axis runs.
fn matching_range<T>(values: &[T], keep: impl Fn(&T) -> bool) -> Option<Range<usize>> {
    let first = values.iter().position(&keep)?;
    let last = values.iter().rposition(&keep)?;
    Some(first..last + 1)
}
