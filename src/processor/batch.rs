//! Batch orchestration over many datasets.
//!
//! Each dataset runs on the blocking thread pool, gated by a semaphore so at
//! most `max_concurrent_datasets` are in flight. Failures are isolated to the
//! dataset that raised them unless [`ExtractError::is_fatal_for_batch`] says
//! otherwise.

use crate::boundary::Boundary;
use crate::config::ExtractionConfig;
use crate::dataset;
use crate::error::{ExtractError, Result};
use crate::models::{DataCategory, DateWindow, ExtractionStats};
use crate::processor::DatasetProcessor;
use crate::processor::discovery::DatasetFile;

use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{error, info, warn};

/// Outcome of one dataset in a batch
#[derive(Debug)]
pub struct DatasetReport {
    pub file: DatasetFile,
    pub outcome: Result<ExtractionStats>,
}

/// Results of a whole batch, in dataset index order
#[derive(Debug, Default)]
pub struct BatchStats {
    pub reports: Vec<DatasetReport>,
    pub processing_time: Duration,
}

impl BatchStats {
    pub fn succeeded(&self) -> impl Iterator<Item = &ExtractionStats> {
        self.reports.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&DatasetFile, &ExtractError)> {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.file, e)))
    }

    pub fn datasets_processed(&self) -> usize {
        self.succeeded().count()
    }

    pub fn datasets_failed(&self) -> usize {
        self.failed().count()
    }

    pub fn zero_station_datasets(&self) -> usize {
        self.succeeded().filter(|s| s.is_zero_stations()).count()
    }

    pub fn total_stations(&self) -> usize {
        self.succeeded().map(|s| s.stations_created).sum()
    }
}

/// Runs the extraction pipeline over a list of discovered datasets
#[derive(Debug)]
pub struct BatchProcessor {
    boundary: Arc<Boundary>,
    dates: DateWindow,
    output_base: PathBuf,
    config: ExtractionConfig,
    label: Option<String>,
    show_progress: bool,
}

impl BatchProcessor {
    pub fn new(boundary: Boundary, dates: DateWindow, output_base: impl Into<PathBuf>) -> Self {
        Self {
            boundary: Arc::new(boundary),
            dates,
            output_base: output_base.into(),
            config: ExtractionConfig::default(),
            label: None,
            show_progress: false,
        }
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `label` instead of the detected category for every dataset
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Category used for `file`, honouring the label override
    pub fn category_for(&self, file: &DatasetFile) -> DataCategory {
        match &self.label {
            Some(label) => DataCategory::Custom(label.clone()),
            None => file.category.clone(),
        }
    }

    /// Process every dataset and collect per-dataset outcomes
    pub async fn run(&self, datasets: Vec<DatasetFile>) -> Result<BatchStats> {
        let start_time = Instant::now();
        self.dates.validate()?;
        self.config.validate()?;

        tokio::fs::create_dir_all(&self.output_base)
            .await
            .map_err(|e| ExtractError::write_failed(&self.output_base, e))?;

        info!(
            "Processing {} datasets ({} at a time) into {}",
            datasets.len(),
            self.config.max_concurrent_datasets,
            self.output_base.display()
        );

        let multi = self.show_progress.then(MultiProgress::new);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_datasets));

        let mut results = pin!(stream::iter(datasets)
            .map(|file| {
                let boundary = Arc::clone(&self.boundary);
                let config = self.config.clone();
                let dates = self.dates;
                let category = self.category_for(&file);
                let output_dir = file.output_dir(&self.output_base);
                let progress = multi.as_ref().map(|m| m.add(create_cell_progress_bar()));
                let semaphore = Arc::clone(&semaphore);

                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let outcome = Err(ExtractError::ProcessingInterrupted {
                                reason: format!("dataset queue closed: {}", e),
                            });
                            return DatasetReport { file, outcome };
                        }
                    };
                    let path = file.path.clone();
                    let outcome = task::spawn_blocking(move || {
                        extract_dataset(
                            &path, &boundary, dates, category, output_dir, config, progress,
                        )
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(ExtractError::unreadable(
                            &file.path,
                            format!("worker task failed: {}", e),
                        ))
                    });

                    match &outcome {
                        Ok(stats) => info!(
                            "[{}] {}: {} stations",
                            file.index, file.name, stats.stations_created
                        ),
                        Err(e) => error!("[{}] {} failed: {}", file.index, file.name, e),
                    }
                    DatasetReport { file, outcome }
                }
            })
            .buffer_unordered(self.config.max_concurrent_datasets));

        // A fatal report drops the stream, cancelling datasets not yet started
        let mut reports = Vec::new();
        while let Some(report) = results.next().await {
            match report.outcome {
                Err(e) if e.is_fatal_for_batch() => {
                    error!("[{}] {} stopped the batch", report.file.index, report.file.name);
                    return Err(e);
                }
                outcome => reports.push(DatasetReport {
                    file: report.file,
                    outcome,
                }),
            }
        }
        reports.sort_by_key(|r| r.file.index);

        let stats = BatchStats {
            reports,
            processing_time: start_time.elapsed(),
        };
        if stats.zero_station_datasets() > 0 {
            warn!(
                "{} datasets produced no stations",
                stats.zero_station_datasets()
            );
        }
        Ok(stats)
    }
}

/// Open one dataset file and run it through [`DatasetProcessor`]
pub fn extract_dataset(
    path: &std::path::Path,
    boundary: &Boundary,
    dates: DateWindow,
    category: DataCategory,
    output_dir: PathBuf,
    config: ExtractionConfig,
    progress: Option<ProgressBar>,
) -> Result<ExtractionStats> {
    boundary.extent()?;
    let source = dataset::open(path, config.chunk)?;
    let mut processor = DatasetProcessor::new(source.as_ref(), boundary, dates, category, output_dir)
        .with_config(config);
    if let Some(pb) = progress {
        processor = processor.with_progress(pb);
    }
    processor.process()
}

/// Progress bar for the per-cell scan of one dataset
pub fn create_cell_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
