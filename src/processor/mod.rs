//! Extraction engine.
//!
//! Runs one gridded dataset through the pipeline: extent calculation, array
//! cropping, grid-boundary intersection, station extraction and the registry
//! write. [`batch::BatchProcessor`] drives many datasets concurrently.

pub mod batch;
pub mod cropper;
pub mod discovery;
pub mod extent;
pub mod extractor;
pub mod intersector;
pub mod registry;

#[cfg(test)]
pub mod tests;

use self::cropper::{ArrayCropper, CropOutcome, GridAxes};
use self::extractor::StationExtractor;

use crate::boundary::Boundary;
use crate::config::{ExtractionConfig, HeaderDate, SystemProfile};
use crate::dataset::GriddedSource;
use crate::error::{ExtractError, Result};
use crate::models::{DataCategory, DateWindow, ExtractionStats, RunPhase};

use indicatif::ProgressBar;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extracts virtual stations from a single gridded dataset
pub struct DatasetProcessor<'a> {
    source: &'a dyn GriddedSource,
    boundary: &'a Boundary,
    dates: DateWindow,
    category: DataCategory,
    output_dir: PathBuf,
    config: ExtractionConfig,
    system_profile: SystemProfile,
    progress: Option<ProgressBar>,
    phase: RunPhase,
}

impl<'a> DatasetProcessor<'a> {
    /// Create a processor writing into `output_dir`
    pub fn new(
        source: &'a dyn GriddedSource,
        boundary: &'a Boundary,
        dates: DateWindow,
        category: DataCategory,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            boundary,
            dates,
            category,
            output_dir: output_dir.into(),
            config: ExtractionConfig::default(),
            system_profile: SystemProfile::detect(),
            progress: None,
            phase: RunPhase::Init,
        }
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Report per-cell scan progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, next: RunPhase) {
        debug!("{}: {} -> {}", self.category, self.phase, next);
        self.phase = next;
    }

    /// Run the whole pipeline; any error leaves the processor ABORTED
    pub fn process(&mut self) -> Result<ExtractionStats> {
        let start_time = Instant::now();
        self.transition(RunPhase::Init);

        match self.run() {
            Ok(mut stats) => {
                self.transition(RunPhase::Done);
                stats.processing_time_ms = start_time.elapsed().as_millis();
                info!(
                    "{}: {} stations from {} cells in {}ms",
                    stats.label,
                    stats.stations_created,
                    stats.cells_scanned,
                    stats.processing_time_ms
                );
                Ok(stats)
            }
            Err(error) => {
                warn!("{}: aborted in {}: {}", self.category, self.phase, error);
                self.transition(RunPhase::Aborted);
                Err(error)
            }
        }
    }

    fn run(&mut self) -> Result<ExtractionStats> {
        self.config.validate()?;

        let prefix = self.category.station_prefix();
        let registry_path = registry::registry_path(&self.output_dir, &prefix);
        let mut stats = ExtractionStats {
            label: self.category.label(),
            output_dir: self.output_dir.clone(),
            ..ExtractionStats::default()
        };

        // INIT: pick the variable and work out the crop extent
        let variables = self.source.variables()?;
        let variable = variables
            .primary()
            .ok_or_else(|| ExtractError::unreadable(self.source.name(), "no data variables"))?
            .to_string();
        if !variables.ignored().is_empty() {
            warn!(
                "{} declares {} data variables; only '{}' is extracted",
                self.source.name(),
                variables.len(),
                variable
            );
        }
        stats.variable = Some(variable.clone());

        let axes = GridAxes::load(self.source)?;
        let resolution = extent::grid_resolution(&axes.lats)?;
        let bounds = self.boundary.extent()?;
        let extent = extent::buffered_extent(&bounds, resolution, self.config.buffer_cells);

        let cropper = ArrayCropper::new(self.system_profile.memory_mb);
        let outcome = cropper.crop(
            self.source,
            &variable,
            &axes,
            &extent,
            &self.dates,
            resolution,
        )?;
        self.transition(RunPhase::Cropped);

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExtractError::write_failed(&self.output_dir, e))?;
        let stale = extractor::clear_previous_outputs(&self.output_dir, &prefix)?;
        if stale > 0 {
            info!(
                "{}: replaced {} files from a previous run",
                self.source.name(),
                stale
            );
        }

        let grid = match outcome {
            CropOutcome::Window(grid) => grid,
            CropOutcome::NoData(absent) => {
                warn!("{}: {}", self.source.name(), absent);
                stats.data_absent = Some(absent);
                self.transition(RunPhase::Finalizing);
                registry::write_registry(&registry_path, &[])?;
                stats.registry_path = Some(registry_path);
                return Ok(stats);
            }
        };

        // SCANNING
        self.transition(RunPhase::Scanning);
        stats.timesteps = grid.times.len();
        if let Some(pb) = &self.progress {
            pb.set_length(grid.cell_count() as u64);
            pb.set_message(stats.label.clone());
        }

        let scan = intersector::scan(
            &grid,
            self.boundary,
            self.config.scan_mode,
            self.config.workers,
            self.progress.as_ref(),
        )?;
        stats.cells_scanned = scan.cells_scanned;
        stats.cells_skipped = scan.cells_skipped;

        let header_date = match self.config.header_date {
            HeaderDate::Requested => self.dates.start,
            HeaderDate::FirstTimestep => grid.first_date().unwrap_or(self.dates.start),
        };
        let mut extractor = StationExtractor::new(
            &self.output_dir,
            prefix,
            header_date,
            self.config.missing_value_text.clone(),
        );
        for seed in &scan.seeds {
            extractor.extract(&grid, seed)?;
        }
        stats.stations_created = extractor.station_count();

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        if stats.is_zero_stations() {
            warn!(
                "{}: no grid cell intersects the boundary",
                self.source.name()
            );
        }

        // FINALIZING
        self.transition(RunPhase::Finalizing);
        registry::write_registry(&registry_path, &extractor.into_registry())?;
        stats.registry_path = Some(registry_path);

        Ok(stats)
    }
}
