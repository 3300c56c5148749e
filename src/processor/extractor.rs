//! Station extraction: one SWAT record file per qualifying cell.
//!
//! A record file is the start date as `YYYYMMDD` on the first line, followed
//! by one value per line in chronological order.

use crate::constants::{RECORD_DATE_FORMAT, RECORD_FILE_EXTENSION, REGISTRY_FILE_SUFFIX};
use crate::error::{ExtractError, Result};
use crate::models::{StationMetadata, StationSeed};
use crate::processor::cropper::CroppedGrid;
use chrono::NaiveDate;
use glob::Pattern;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Run-scoped station id counter and registry accumulator
#[derive(Debug, Clone)]
pub struct RunContext {
    next_id: u32,
    registry: Vec<StationMetadata>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            registry: Vec::new(),
        }
    }

    /// Hand out the next id; ids are never reused
    pub fn assign_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn record(&mut self, station: StationMetadata) {
        self.registry.push(station);
    }

    pub fn registry(&self) -> &[StationMetadata] {
        &self.registry
    }

    pub fn station_count(&self) -> usize {
        self.registry.len()
    }

    pub fn into_registry(self) -> Vec<StationMetadata> {
        self.registry
    }
}

/// Render one value as its shortest round-trip text; NaN becomes `missing`
pub fn format_value(value: f64, missing: &str) -> String {
    if value.is_nan() {
        missing.to_string()
    } else {
        value.to_string()
    }
}

/// Render a complete record file body
pub fn format_record(
    start: NaiveDate,
    values: impl IntoIterator<Item = f64>,
    missing: &str,
) -> String {
    let mut out = start.format(RECORD_DATE_FORMAT).to_string();
    out.push('\n');
    for value in values {
        // writing to a String cannot fail
        let _ = writeln!(out, "{}", format_value(value, missing));
    }
    out
}

/// Remove record files and the registry an earlier run left under `prefix`.
///
/// Only `{prefix}{id}.csv` and `{prefix}_station.csv` are touched; other files
/// in the directory are kept.
pub fn clear_previous_outputs(output_dir: &Path, prefix: &str) -> Result<usize> {
    let pattern = Path::new(&Pattern::escape(&output_dir.to_string_lossy())).join(format!(
        "{}*.{}",
        Pattern::escape(prefix),
        RECORD_FILE_EXTENSION
    ));
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| ExtractError::configuration(format!("invalid output pattern: {}", e)))?;

    let mut removed = 0;
    for path in entries.flatten() {
        if !path.is_file() || !is_previous_output(&path, prefix) {
            continue;
        }
        fs::remove_file(&path).map_err(|e| ExtractError::write_failed(&path, e))?;
        removed += 1;
    }

    if removed > 0 {
        debug!(
            "Removed {} files from a previous run in {}",
            removed,
            output_dir.display()
        );
    }
    Ok(removed)
}

fn is_previous_output(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name == format!("{}{}", prefix, REGISTRY_FILE_SUFFIX) {
        return true;
    }

    let id = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(RECORD_FILE_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'));
    matches!(id, Some(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
}

/// Writes record files into one dataset output directory
#[derive(Debug)]
pub struct StationExtractor {
    output_dir: PathBuf,
    prefix: String,
    header_date: NaiveDate,
    missing: String,
    context: RunContext,
}

impl StationExtractor {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        header_date: NaiveDate,
        missing: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            header_date,
            missing: missing.into(),
            context: RunContext::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the record file for station `id`
    pub fn record_path(&self, id: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.{}", self.prefix, id, RECORD_FILE_EXTENSION))
    }

    /// Write the record for `seed` and register the station
    pub fn extract(&mut self, grid: &CroppedGrid, seed: &StationSeed) -> Result<&StationMetadata> {
        let id = self.context.assign_id();
        let name = format!("{}{}", self.prefix, id);
        let path = self.record_path(id);

        let body = format_record(
            self.header_date,
            grid.series(seed.i, seed.j).iter().copied(),
            &self.missing,
        );
        fs::write(&path, body).map_err(|e| ExtractError::write_failed(&path, e))?;
        debug!(
            "Wrote {} for cell ({}, {}) at {:.4}, {:.4}",
            path.display(),
            seed.i,
            seed.j,
            seed.lat,
            seed.lon
        );

        self.context.record(StationMetadata {
            id,
            name,
            lat: seed.lat,
            lon: seed.lon,
        });
        Ok(&self.context.registry[self.context.registry.len() - 1])
    }

    pub fn station_count(&self) -> usize {
        self.context.station_count()
    }

    pub fn into_registry(self) -> Vec<StationMetadata> {
        self.context.into_registry()
    }
}
