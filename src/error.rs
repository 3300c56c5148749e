//! Error handling for station extraction.
//!
//! Fatal per-dataset failures live in [`ExtractError`]. The two non-fatal
//! outcomes (an empty crop window and a per-cell geometry failure) are plain
//! values, see [`crate::models::DataAbsent`] and
//! [`crate::processor::intersector::CellGeometryError`].

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Dataset not found at path: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Boundary file not found at path: {path}")]
    BoundaryNotFound { path: PathBuf },

    #[error("Invalid boundary geometry in {path}: {reason}")]
    InvalidBoundary { path: PathBuf, reason: String },

    #[error("Unreadable gridded dataset {path}: {reason}")]
    UnreadableDataset { path: PathBuf, reason: String },

    #[error("Cannot derive grid resolution: {reason}")]
    UndecidableResolution { reason: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

/// Coarse classification used when reporting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Interrupted,
}

impl ExtractError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unreadable-dataset error
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableDataset {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a write failure with the path being written
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Io(_) | ExtractError::Polars(_) | ExtractError::WriteFailed { .. } => {
                ErrorKind::Io
            }
            ExtractError::ProcessingInterrupted { .. } => ErrorKind::Interrupted,
            _ => ErrorKind::Configuration,
        }
    }

    /// Whether this error should stop the remaining datasets of a batch.
    ///
    /// Dataset-level configuration and write failures are isolated to the
    /// dataset that raised them; only boundary problems, an invalid date
    /// window and interruption affect every dataset alike.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            ExtractError::BoundaryNotFound { .. }
                | ExtractError::InvalidBoundary { .. }
                | ExtractError::GeoJson(_)
                | ExtractError::InvalidDateRange { .. }
                | ExtractError::ProcessingInterrupted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
