use anyhow::Context;
use clap::Parser;
use std::process;
use swat_weather::cli::{args::Args, commands};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // no handler available; never resolve
                std::future::pending::<()>().await;
            }
        };

        // Dropping the batch future cancels outstanding datasets
        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(swat_weather::ExtractError::ProcessingInterrupted {
                    reason: "Processing interrupted by user".to_string(),
                })
            }
        }
    });

    match result {
        Ok(_stats) => Ok(()),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
