//! Station registry writer.
//!
//! Writes `{PREFIX}_station.csv` with columns `ID,station_names,Lat,Lon`, one
//! row per station in id order. Zero stations still produce the header line.

use crate::constants::{REGISTRY_COLUMNS, REGISTRY_FILE_SUFFIX};
use crate::error::{ExtractError, Result};
use crate::models::StationMetadata;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registry file path inside a dataset output directory
pub fn registry_path(output_dir: &Path, prefix: &str) -> PathBuf {
    output_dir.join(format!("{}{}", prefix, REGISTRY_FILE_SUFFIX))
}

/// Build the registry frame in id order
pub fn registry_frame(stations: &[StationMetadata]) -> Result<DataFrame> {
    let mut sorted: Vec<&StationMetadata> = stations.iter().collect();
    sorted.sort_by_key(|s| s.id);

    let frame = df!(
        REGISTRY_COLUMNS[0] => sorted.iter().map(|s| s.id).collect::<Vec<u32>>(),
        REGISTRY_COLUMNS[1] => sorted.iter().map(|s| s.name.clone()).collect::<Vec<String>>(),
        REGISTRY_COLUMNS[2] => sorted.iter().map(|s| s.lat).collect::<Vec<f64>>(),
        REGISTRY_COLUMNS[3] => sorted.iter().map(|s| s.lon).collect::<Vec<f64>>(),
    )?;
    Ok(frame)
}

/// Write the registry CSV, replacing any existing file
pub fn write_registry(path: &Path, stations: &[StationMetadata]) -> Result<()> {
    let mut frame = registry_frame(stations)?;
    let file = File::create(path).map_err(|e| ExtractError::write_failed(path, e))?;

    CsvWriter::new(file)
        .include_header(true)
        .with_float_scientific(Some(false))
        .finish(&mut frame)?;

    debug!("Wrote registry {} ({} stations)", path.display(), stations.len());
    Ok(())
}
