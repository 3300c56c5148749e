//! Core data structures shared across the extraction pipeline.
//!
//! Defines data categories, bounding boxes, date windows, station seeds and
//! metadata, run phases and the per-dataset statistics returned to callers.

use crate::constants::{RAINFALL_KEYWORDS, TEMPERATURE_KEYWORDS};
use crate::error::{ExtractError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Climate variable category, used only for naming outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataCategory {
    Rainfall,
    Temperature,
    /// Unrecognised dataset, numbered by its 1-based position in the batch
    Other(usize),
    /// Label supplied explicitly by the caller
    Custom(String),
}

impl DataCategory {
    /// Detect the category from a dataset file name
    pub fn from_file_name(file_name: &str, index: usize) -> Self {
        let name = file_name.to_lowercase();

        if RAINFALL_KEYWORDS.iter().any(|k| name.contains(k)) {
            DataCategory::Rainfall
        } else if TEMPERATURE_KEYWORDS.iter().any(|k| name.contains(k)) {
            DataCategory::Temperature
        } else {
            DataCategory::Other(index)
        }
    }

    /// Lowercase label, e.g. `rainfall` or `climate_var_3`
    pub fn label(&self) -> String {
        match self {
            DataCategory::Rainfall => "rainfall".to_string(),
            DataCategory::Temperature => "temperature".to_string(),
            DataCategory::Other(index) => format!("climate_var_{}", index),
            DataCategory::Custom(label) => label.clone(),
        }
    }

    /// Prefix for generated station names and file names
    pub fn station_prefix(&self) -> String {
        self.label().to_uppercase()
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Axis-aligned box in the planar (lon, lat) units of the inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Expand the box by `margin` on every side
    pub fn buffered(&self, margin: f64) -> Self {
        Self {
            min_lon: self.min_lon - margin,
            min_lat: self.min_lat - margin,
            max_lon: self.max_lon + margin,
            max_lat: self.max_lat + margin,
        }
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}°N to {:.3}°N, {:.3}°E to {:.3}°E",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// Inclusive calendar date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_inverted() {
            return Err(ExtractError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A cell that passed the boundary test, before it has a station id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSeed {
    pub i: usize,
    pub j: usize,
    pub lat: f64,
    pub lon: f64,
    /// Share of the cell rectangle covered by the boundary, in (0, 1]
    pub fraction: f64,
}

/// One row of the station registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Why a crop window came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoDataReason {
    InvertedDates,
    OutsideTimeCoverage,
    OutsideSpatialExtent,
}

/// Non-fatal outcome: nothing to extract in the requested window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAbsent {
    pub reason: NoDataReason,
}

impl fmt::Display for DataAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            NoDataReason::InvertedDates => "start date is after end date",
            NoDataReason::OutsideTimeCoverage => "date range outside dataset time coverage",
            NoDataReason::OutsideSpatialExtent => "boundary outside dataset spatial extent",
        };
        write!(f, "no data in window: {}", reason)
    }
}

/// Phases of a single dataset extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Init,
    Cropped,
    Scanning,
    Finalizing,
    Done,
    Aborted,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Init => "INIT",
            RunPhase::Cropped => "CROPPED",
            RunPhase::Scanning => "SCANNING",
            RunPhase::Finalizing => "FINALIZING",
            RunPhase::Done => "DONE",
            RunPhase::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Statistics for one processed dataset
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    pub label: String,
    /// Variable that was extracted (first declared data variable)
    pub variable: Option<String>,
    pub stations_created: usize,
    pub cells_scanned: usize,
    /// Cells dropped because their geometry could not be evaluated
    pub cells_skipped: usize,
    pub timesteps: usize,
    pub data_absent: Option<DataAbsent>,
    pub output_dir: PathBuf,
    pub registry_path: Option<PathBuf>,
    pub processing_time_ms: u128,
}

impl ExtractionStats {
    pub fn is_zero_stations(&self) -> bool {
        self.stations_created == 0
    }
}
