//! SWAT Weather Library
//!
//! Converts gridded daily climate data (NetCDF) into SWAT "virtual weather
//! station" files, clipped to a study-area boundary.
//!
//! This library provides tools for:
//! - Reading gridded (time, lat, lon) datasets lazily, one cropped window at a time
//! - Loading multi-feature GeoJSON boundaries
//! - Selecting every grid cell whose footprint overlaps the boundary
//! - Writing one record file per station and a station registry CSV
//! - Running many datasets as an isolated, concurrent batch

pub mod boundary;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod models;
pub mod processor;

pub use boundary::Boundary;
pub use config::{ExtractionConfig, HeaderDate, ScanMode};
pub use dataset::{GriddedSource, MemoryGrid};
pub use error::{ExtractError, Result};
pub use models::{DataCategory, DateWindow, ExtractionStats, StationMetadata};
pub use processor::DatasetProcessor;
pub use processor::batch::{BatchProcessor, BatchStats};
