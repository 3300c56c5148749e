//! Integration tests for the processor module
//!
//! Runs the full extraction pipeline against in-memory grids and writes into
//! temporary directories.


use crate::boundary::Boundary;
use crate::config::ExtractionConfig;
use crate::dataset::MemoryGrid;
use crate::error::Result;
use crate::models::{DataCategory, DateWindow, ExtractionStats, RunPhase};
use crate::processor::DatasetProcessor;
use chrono::NaiveDate;
use geo::{LineString, MultiPolygon, Polygon};
use ndarray::Array3;
use std::fs;
use std::path::Path;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dates(start: NaiveDate, end: NaiveDate) -> DateWindow {
    DateWindow { start, end }
}

/// Axis-aligned rectangle boundaries
pub fn rectangles(boxes: &[(f64, f64, f64, f64)]) -> Boundary {
    let polygons = boxes
        .iter()
        .map(|&(min_x, min_y, max_x, max_y)| {
            Polygon::new(
                LineString::from(vec![
                    (min_x, min_y),
                    (max_x, min_y),
                    (max_x, max_y),
                    (min_x, max_y),
                    (min_x, min_y),
                ]),
                vec![],
            )
        })
        .collect();
    Boundary::new(MultiPolygon::new(polygons))
}

/// Unit-resolution centres `0.5, 1.5, ...`
pub fn centres(n: usize) -> Vec<f64> {
    (0..n).map(|k| k as f64 + 0.5).collect()
}

/// Daily grid whose value at (t, i, j) is `t * 100 + i * 10 + j`
pub fn indexed_grid(start: NaiveDate, days: usize, lats: Vec<f64>, lons: Vec<f64>) -> MemoryGrid {
    let shape = (days, lats.len(), lons.len());
    let values = Array3::from_shape_fn(shape, |(t, i, j)| (t * 100 + i * 10 + j) as f64);
    MemoryGrid::daily("fixture", start, days, lats, lons)
        .with_variable("pr", values)
        .unwrap()
}

/// Run one extraction and report the final phase alongside the result
pub fn run_extraction(
    source: &MemoryGrid,
    boundary: &Boundary,
    window: DateWindow,
    output_dir: &Path,
    config: ExtractionConfig,
) -> (RunPhase, Result<ExtractionStats>) {
    let mut processor = DatasetProcessor::new(
        source,
        boundary,
        window,
        DataCategory::Rainfall,
        output_dir,
    )
    .with_config(config);
    let result = processor.process();
    (processor.phase(), result)
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
