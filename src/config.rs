//! Configuration management and validation.
//!
//! Provides the extraction configuration (buffering, chunked reads, scan
//! strategy, record formatting) and system profiling used to pick defaults.

use crate::constants::{
    DEFAULT_BUFFER_CELLS, DEFAULT_CHUNK_LAT, DEFAULT_CHUNK_LON, DEFAULT_CHUNK_TIME,
    DEFAULT_MAX_CONCURRENT_DATASETS, MIN_BUFFER_CELLS,
};
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Block shape for lazy reads along (time, lat, lon)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkShape {
    pub time: usize,
    pub lat: usize,
    pub lon: usize,
}

impl Default for ChunkShape {
    fn default() -> Self {
        Self {
            time: DEFAULT_CHUNK_TIME,
            lat: DEFAULT_CHUNK_LAT,
            lon: DEFAULT_CHUNK_LON,
        }
    }
}

/// How grid cells are visited during the intersection scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    /// Row-major, single thread
    Sequential,
    /// Cells evaluated on a rayon pool; ids assigned afterwards in (i, j) order
    Parallel,
}

/// Which date is written on the first line of every record file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderDate {
    /// The start of the requested window
    Requested,
    /// The first timestep that survived cropping
    FirstTimestep,
}

/// System profiling information used for memory warnings
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// Total memory in MB
    pub memory_mb: usize,
}

impl SystemProfile {
    /// Auto-detect system capabilities
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut system = System::new();
        system.refresh_memory();
        let memory_mb = (system.total_memory() / 1024 / 1024) as usize;

        debug!("System profile: {}MB memory", memory_mb);

        Self { memory_mb }
    }
}

/// Configuration for extracting stations from one or more datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Buffer around the boundary bounding box, in multiples of the resolution
    pub buffer_cells: f64,

    /// Chunk shape for lazy reads
    pub chunk: ChunkShape,

    /// Cell visiting strategy
    pub scan_mode: ScanMode,

    /// Worker threads for the parallel scan
    pub workers: usize,

    /// Datasets processed concurrently by the batch orchestrator
    pub max_concurrent_datasets: usize,

    /// Date written on the first line of record files
    pub header_date: HeaderDate,

    /// Text written for missing (NaN) values in record files
    pub missing_value_text: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            buffer_cells: DEFAULT_BUFFER_CELLS,
            chunk: ChunkShape::default(),
            scan_mode: ScanMode::Sequential,
            workers: num_cpus::get().max(1),
            max_concurrent_datasets: DEFAULT_MAX_CONCURRENT_DATASETS,
            header_date: HeaderDate::Requested,
            missing_value_text: String::new(),
        }
    }
}

impl ExtractionConfig {
    /// Set the bounding box buffer in grid cells
    pub fn with_buffer_cells(mut self, buffer_cells: f64) -> Self {
        self.buffer_cells = buffer_cells;
        self
    }

    /// Set the read chunk shape
    pub fn with_chunk(mut self, chunk: ChunkShape) -> Self {
        self.chunk = chunk;
        self
    }

    /// Evaluate cells on a rayon pool
    pub fn with_parallel_scan(mut self, workers: usize) -> Self {
        self.scan_mode = ScanMode::Parallel;
        self.workers = workers;
        self
    }

    pub fn with_max_concurrent_datasets(mut self, max: usize) -> Self {
        self.max_concurrent_datasets = max;
        self
    }

    pub fn with_header_date(mut self, header_date: HeaderDate) -> Self {
        self.header_date = header_date;
        self
    }

    pub fn with_missing_value_text(mut self, text: impl Into<String>) -> Self {
        self.missing_value_text = text.into();
        self
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        if !self.buffer_cells.is_finite() || self.buffer_cells < MIN_BUFFER_CELLS {
            return Err(ExtractError::configuration(format!(
                "buffer_cells must be at least {}, got {}",
                MIN_BUFFER_CELLS, self.buffer_cells
            )));
        }
        if self.chunk.time == 0 || self.chunk.lat == 0 || self.chunk.lon == 0 {
            return Err(ExtractError::configuration(format!(
                "chunk sizes must be positive, got {:?}",
                self.chunk
            )));
        }
        if self.workers == 0 {
            return Err(ExtractError::configuration("workers must be at least 1"));
        }
        if self.max_concurrent_datasets == 0 {
            return Err(ExtractError::configuration(
                "max_concurrent_datasets must be at least 1",
            ));
        }
        if self.missing_value_text.contains('\n') {
            return Err(ExtractError::configuration(
                "missing value text cannot contain a newline",
            ));
        }
        Ok(())
    }
}
