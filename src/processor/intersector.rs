//! Grid-boundary intersection.
//!
//! Every cell of the cropped window is turned into a square polygon centred on
//! its (lat, lon) with side equal to the grid resolution, then intersected
//! with the boundary. A cell becomes a station when the overlap has strictly
//! positive area. Cells whose geometry cannot be evaluated are skipped and
//! counted, and never abort the scan.

use crate::boundary::Boundary;
use crate::config::ScanMode;
use crate::error::{ExtractError, Result};
use crate::models::StationSeed;
use crate::processor::cropper::CroppedGrid;
use geo::{Area, LineString, Polygon};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

/// Per-cell geometry failure; the cell is skipped and the scan continues
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellGeometryError {
    #[error("cell ({i}, {j}) has non-finite coordinates")]
    NonFiniteCoordinates { i: usize, j: usize },

    #[error("cell ({i}, {j}) produced a non-finite overlap area")]
    NonFiniteArea { i: usize, j: usize },

    #[error("geometry operation failed for cell ({i}, {j}): {reason}")]
    OperationFailed { i: usize, j: usize, reason: String },
}

/// Outcome of testing one cell against the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum CellVerdict {
    Station(StationSeed),
    Outside,
    Skipped(CellGeometryError),
}

/// Ordered scan output
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Qualifying cells in row-major order
    pub seeds: Vec<StationSeed>,
    pub cells_scanned: usize,
    pub cells_skipped: usize,
}

impl ScanResult {
    fn accumulate(mut self, verdict: CellVerdict) -> Self {
        self.cells_scanned += 1;
        match verdict {
            CellVerdict::Station(seed) => self.seeds.push(seed),
            CellVerdict::Outside => {}
            CellVerdict::Skipped(error) => {
                debug!("Skipping cell: {}", error);
                self.cells_skipped += 1;
            }
        }
        self
    }
}

/// Square cell polygon, counter-clockwise from the south-west corner
pub fn cell_polygon(lat: f64, lon: f64, resolution: f64) -> Polygon<f64> {
    let half = resolution / 2.0;
    let exterior = LineString::from(vec![
        (lon - half, lat - half),
        (lon + half, lat - half),
        (lon + half, lat + half),
        (lon - half, lat + half),
        (lon - half, lat - half),
    ]);
    Polygon::new(exterior, vec![])
}

/// Test cell (i, j) of `grid` against `boundary`
pub fn evaluate_cell(grid: &CroppedGrid, boundary: &Boundary, i: usize, j: usize) -> CellVerdict {
    let Some((lat, lon)) = grid.center(i, j) else {
        return CellVerdict::Skipped(CellGeometryError::OperationFailed {
            i,
            j,
            reason: "index outside the cropped window".to_string(),
        });
    };

    if !lat.is_finite() || !lon.is_finite() {
        return CellVerdict::Skipped(CellGeometryError::NonFiniteCoordinates { i, j });
    }

    let cell = cell_polygon(lat, lon, grid.resolution);
    let cell_area = cell.unsigned_area();

    let overlap = panic::catch_unwind(AssertUnwindSafe(|| boundary.intersection_area(&cell)));
    let overlap = match overlap {
        Ok(area) => area,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "boolean operation panicked".to_string());
            return CellVerdict::Skipped(CellGeometryError::OperationFailed { i, j, reason });
        }
    };

    if !overlap.is_finite() || !cell_area.is_finite() || cell_area <= 0.0 {
        return CellVerdict::Skipped(CellGeometryError::NonFiniteArea { i, j });
    }

    if overlap > 0.0 {
        CellVerdict::Station(StationSeed {
            i,
            j,
            lat,
            lon,
            fraction: (overlap / cell_area).min(1.0),
        })
    } else {
        CellVerdict::Outside
    }
}

/// Convenience form of [`evaluate_cell`] that only keeps qualifying cells
pub fn test_cell(grid: &CroppedGrid, boundary: &Boundary, i: usize, j: usize) -> Option<StationSeed> {
    match evaluate_cell(grid, boundary, i, j) {
        CellVerdict::Station(seed) => Some(seed),
        _ => None,
    }
}

/// Scan every cell of `grid` in row-major order.
///
/// The parallel mode evaluates cells on a dedicated rayon pool but collects
/// verdicts in cell order, so the seeds (and therefore station ids) are the
/// same as a sequential scan.
pub fn scan(
    grid: &CroppedGrid,
    boundary: &Boundary,
    mode: ScanMode,
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Result<ScanResult> {
    let cells = grid.cells();
    let evaluate = |&(i, j): &(usize, usize)| {
        let verdict = evaluate_cell(grid, boundary, i, j);
        if let Some(pb) = progress {
            pb.inc(1);
        }
        verdict
    };

    let verdicts: Vec<CellVerdict> = match mode {
        ScanMode::Sequential => cells.iter().map(evaluate).collect(),
        ScanMode::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers.max(1))
                .build()
                .map_err(|e| {
                    ExtractError::configuration(format!("failed to build scan thread pool: {}", e))
                })?;
            pool.install(|| cells.par_iter().map(evaluate).collect())
        }
    };

    let result = verdicts
        .into_iter()
        .fold(ScanResult::default(), ScanResult::accumulate);

    debug!(
        "Scanned {} cells ({:?}): {} stations, {} skipped",
        result.cells_scanned,
        mode,
        result.seeds.len(),
        result.cells_skipped
    );
    Ok(result)
}
