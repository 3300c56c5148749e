//! Command-line argument definitions for the SWAT weather extractor
//!
//! Defines the CLI using the clap derive API and maps flags onto
//! [`ExtractionConfig`].

use crate::config::{ExtractionConfig, HeaderDate};
use crate::constants::{DEFAULT_BUFFER_CELLS, DEFAULT_MAX_CONCURRENT_DATASETS};
use crate::models::DateWindow;
use crate::{ExtractError, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the SWAT virtual weather station extractor
///
/// Clips gridded NetCDF climate data to a study-area boundary and writes one
/// SWAT weather record per grid cell that overlaps it, plus a station registry.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "swat-weather",
    version,
    about = "Convert gridded NetCDF climate data into SWAT virtual weather stations",
    long_about = "Reads gridded daily climate datasets (rainfall, temperature, ...), crops them \
                  to a study-area boundary and date window, and writes one SWAT-ready record file \
                  per grid cell that overlaps the boundary together with a station registry CSV."
)]
pub struct Args {
    /// Study-area boundary (GeoJSON, same coordinate system as the grids)
    #[arg(short = 'b', long = "boundary", value_name = "GEOJSON")]
    pub boundary: PathBuf,

    /// A NetCDF file, or a directory whose `.nc` files are all processed
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory; each dataset writes into File_<n>_<name>/ below it
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// First day to extract (YYYY-MM-DD, inclusive)
    #[arg(short = 's', long = "start", value_name = "DATE")]
    pub start: NaiveDate,

    /// Last day to extract (YYYY-MM-DD, inclusive)
    #[arg(short = 'e', long = "end", value_name = "DATE")]
    pub end: NaiveDate,

    /// Label used for station names instead of the detected category
    #[arg(long = "label", value_name = "LABEL")]
    pub label: Option<String>,

    /// Evaluate grid cells on a thread pool
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Worker threads for --parallel (defaults to the number of CPUs)
    #[arg(short = 'j', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Datasets processed at the same time
    #[arg(
        long = "max-concurrent",
        value_name = "N",
        default_value_t = DEFAULT_MAX_CONCURRENT_DATASETS
    )]
    pub max_concurrent: usize,

    /// Date written on the first line of every record file
    #[arg(long = "header-date", value_enum, default_value_t = HeaderDateArg::Requested)]
    pub header_date: HeaderDateArg,

    /// Text written for missing values (empty line by default)
    #[arg(
        long = "missing-value",
        value_name = "TEXT",
        default_value = "",
        allow_hyphen_values = true
    )]
    pub missing_value: String,

    /// Bounding box buffer in grid cells
    #[arg(long = "buffer-cells", value_name = "CELLS", default_value_t = DEFAULT_BUFFER_CELLS)]
    pub buffer_cells: f64,

    /// List the datasets that would be processed, then exit
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Enable verbose logging (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress progress bars and non-error output
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Header date choices accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeaderDateArg {
    /// The requested start date
    Requested,
    /// The first timestep inside the requested window
    FirstTimestep,
}

impl From<HeaderDateArg> for HeaderDate {
    fn from(arg: HeaderDateArg) -> Self {
        match arg {
            HeaderDateArg::Requested => HeaderDate::Requested,
            HeaderDateArg::FirstTimestep => HeaderDate::FirstTimestep,
        }
    }
}

impl Args {
    /// Validated date window
    pub fn date_window(&self) -> Result<DateWindow> {
        DateWindow::new(self.start, self.end)
    }

    /// Build the extraction configuration from the flags
    pub fn extraction_config(&self) -> Result<ExtractionConfig> {
        let mut config = ExtractionConfig::default()
            .with_buffer_cells(self.buffer_cells)
            .with_max_concurrent_datasets(self.max_concurrent)
            .with_header_date(self.header_date.into())
            .with_missing_value_text(self.missing_value.clone());

        if self.parallel {
            let workers = self.workers.unwrap_or(config.workers);
            config = config.with_parallel_scan(workers);
        } else if self.workers.is_some() {
            return Err(ExtractError::configuration(
                "--workers requires --parallel",
            ));
        }

        config.validate()?;
        Ok(config)
    }

    /// Label override, ignoring blank values
    pub fn label(&self) -> Option<String> {
        self.label
            .as_ref()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanMode;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "swat-weather",
            "--boundary",
            "area.geojson",
            "--input",
            "data",
            "--output",
            "out",
            "--start",
            "1990-01-01",
            "--end",
            "1990-12-31",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let config = args.extraction_config().unwrap();
        assert_eq!(config.scan_mode, ScanMode::Sequential);
        assert_eq!(config.buffer_cells, 2.0);
        assert_eq!(config.header_date, HeaderDate::Requested);
        assert_eq!(config.missing_value_text, "");
        assert!(args.label().is_none());
        assert_eq!(args.get_log_level(), "warn");
    }

    #[test]
    fn test_parallel_flags() {
        let args = parse(&["--parallel", "-j", "3", "--max-concurrent", "2"]);
        let config = args.extraction_config().unwrap();
        assert_eq!(config.scan_mode, ScanMode::Parallel);
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_concurrent_datasets, 2);
    }

    #[test]
    fn test_workers_without_parallel_rejected() {
        let args = parse(&["-j", "3"]);
        assert!(args.extraction_config().is_err());
    }

    #[test]
    fn test_header_date_and_missing_value() {
        let args = parse(&["--header-date", "first-timestep", "--missing-value", "-99.0"]);
        let config = args.extraction_config().unwrap();
        assert_eq!(config.header_date, HeaderDate::FirstTimestep);
        assert_eq!(config.missing_value_text, "-99.0");
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut args = parse(&[]);
        args.start = NaiveDate::from_ymd_opt(1991, 1, 1).unwrap();
        assert!(matches!(
            args.date_window().unwrap_err(),
            ExtractError::InvalidDateRange { .. }
        ));
    }

    #[test]
    fn test_malformed_date_rejected_by_parser() {
        let result = Args::try_parse_from([
            "swat-weather",
            "-b",
            "a.geojson",
            "-i",
            "d",
            "-o",
            "o",
            "-s",
            "1990/01/01",
            "-e",
            "1990-12-31",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["-vv"]).get_log_level(), "debug");
        assert_eq!(parse(&["-q"]).get_log_level(), "error");
        assert!(!parse(&["-q"]).show_progress());
        assert!(Args::try_parse_from([
            "swat-weather", "-b", "a", "-i", "d", "-o", "o", "-s", "1990-01-01", "-e",
            "1990-01-02", "-q", "-v",
        ])
        .is_err());
    }

    #[test]
    fn test_blank_label_ignored() {
        assert!(parse(&["--label", "  "]).label().is_none());
        assert_eq!(parse(&["--label", "pet"]).label().as_deref(), Some("pet"));
    }
}
