//! Command implementation for the SWAT weather extractor CLI
//!
//! Sets up logging, validates inputs, discovers datasets and drives the batch
//! processor, then prints a summary.

use crate::boundary::Boundary;
use crate::cli::args::Args;
use crate::processor::batch::{BatchProcessor, BatchStats};
use crate::processor::discovery::{DatasetDiscovery, DatasetFile};
use crate::{ExtractError, Result};
use colored::*;
use indicatif::HumanDuration;
use std::path::Path;
use tracing::{debug, info};

/// Run the extraction workflow:
/// 1. Set up logging and validate the date window and configuration
/// 2. Load the boundary and discover datasets
/// 3. Process every dataset (or only list them in dry-run mode)
/// 4. Print the summary
pub async fn run(args: Args) -> Result<BatchStats> {
    setup_logging(&args)?;
    info!("Starting SWAT weather extraction");
    debug!("Command line arguments: {:?}", args);

    // Dates are checked before any dataset is touched
    let dates = args.date_window()?;
    let config = args.extraction_config()?;

    let boundary = Boundary::from_geojson_path(&args.boundary)?;

    let datasets = DatasetDiscovery::new(&args.input).discover()?;
    if datasets.is_empty() {
        return Err(ExtractError::configuration(format!(
            "No NetCDF files found in {}",
            args.input.display()
        )));
    }

    let batch = BatchProcessor::new(boundary, dates, &args.output)
        .with_config(config)
        .with_label(args.label())
        .with_progress(args.show_progress());

    if !args.quiet {
        print_dataset_listing(&batch, &datasets, &args.output);
    }
    if args.dry_run {
        println!("\n{}", "Dry run - nothing written".bright_yellow());
        return Ok(BatchStats::default());
    }

    let stats = batch.run(datasets).await?;
    if !args.quiet {
        print_summary(&stats);
    }
    Ok(stats)
}

/// Set up structured logging
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("swat_weather={}", log_level)));

    let init = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    init.map_err(|e| ExtractError::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn print_dataset_listing(batch: &BatchProcessor, datasets: &[DatasetFile], output: &Path) {
    println!(
        "{} {} datasets",
        "Found".bright_green(),
        datasets.len().to_string().bright_white().bold()
    );
    for file in datasets {
        println!(
            "  {} {} ({:.1} MB) {} {} {} {}",
            format!("[{}]", file.index).bright_cyan(),
            file.name,
            file.size_mb,
            "as".dimmed(),
            batch.category_for(file).label().bright_white(),
            "->".dimmed(),
            file.output_dir(output).display()
        );
    }
}

fn print_summary(stats: &BatchStats) {
    println!("\n{}", "SWAT weather extraction complete".bright_green().bold());
    println!("{}", "━".repeat(41));
    println!(
        "  {} {}",
        "Datasets processed:".bright_cyan(),
        stats.datasets_processed()
    );
    println!(
        "  {} {}",
        "Stations created:".bright_cyan(),
        stats.total_stations()
    );
    println!(
        "  {} {}",
        "Processing time:".bright_cyan(),
        HumanDuration(stats.processing_time)
    );

    for report in &stats.reports {
        match &report.outcome {
            Ok(result) => {
                let note = match (&result.data_absent, result.is_zero_stations()) {
                    (Some(absent), _) => format!(" ({})", absent).yellow().to_string(),
                    (None, true) => " (zero stations)".yellow().to_string(),
                    (None, false) => String::new(),
                };
                println!(
                    "  {} {}: {} stations -> {}{}",
                    "✓".bright_green(),
                    report.file.name,
                    result.stations_created,
                    result.output_dir.display(),
                    note
                );
            }
            Err(e) => println!("  {} {}: {}", "✗".bright_red(), report.file.name, e),
        }
    }

    if stats.zero_station_datasets() > 0 {
        println!(
            "{} {} datasets produced no stations",
            "Warning:".bright_yellow(),
            stats.zero_station_datasets()
        );
    }
    if stats.datasets_failed() > 0 {
        println!(
            "{} {} datasets failed",
            "Errors:".bright_red(),
            stats.datasets_failed()
        );
    }
    println!();
}
