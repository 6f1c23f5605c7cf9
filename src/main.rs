//! hintcrack - Hint-Guided Password Cracking
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use hintcrack::config::{CliArgs, CrackConfig, SummaryFormat};
use hintcrack::progress::{print_header, print_summary, ProgressCounters, ProgressReporter};
use hintcrack::{CrackSystem, Sha256Cracker};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = CrackConfig::from_args(args).context("Invalid configuration")?;

    let output_display = config
        .output_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    // Reports on stdout would interleave with the header and spinner
    let interactive = config.show_progress
        && config.output_path.is_some()
        && config.summary_format == SummaryFormat::Text;

    if interactive {
        print_header(
            &config.input_path.display().to_string(),
            config.worker_count,
            &output_display,
        );
    }

    let summary_format = config.summary_format;
    let show_summary = config.show_progress;
    let mut system = CrackSystem::new(config, Sha256Cracker);

    // Setup signal handler for graceful shutdown
    let shutdown = system.shutdown_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown.interrupt();
    })
    .context("Failed to set signal handler")?;

    // Create progress reporter
    let mut progress = if interactive {
        let counters = Arc::new(ProgressCounters::default());
        system = system.with_progress(Arc::clone(&counters));
        let mut reporter = ProgressReporter::new();
        reporter.set_status("Waiting for workers...");
        reporter.watch(counters);
        Some(reporter)
    } else {
        None
    };

    // Run the cracking pipeline
    let result = system.run();

    // Finish progress
    if let Some(ref mut p) = progress {
        match &result {
            Ok(summary) if summary.interrupted => p.finish("Run interrupted"),
            Ok(_) => p.finish("Run completed"),
            Err(_) => p.finish_and_clear(),
        }
    }

    let summary = result.context("Run failed")?;

    // Print summary
    match summary_format {
        SummaryFormat::Json => {
            println!("{}", summary.to_json().context("Failed to encode summary")?);
        }
        SummaryFormat::Text if show_summary => print_summary(&summary),
        SummaryFormat::Text => {}
    }

    if summary.interrupted {
        info!("Run was interrupted before completion");
    }

    if summary.coordinator.invariant_violations > 0 {
        info!(
            violations = summary.coordinator.invariant_violations,
            "Run completed with invariant violations"
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("hintcrack=debug,warn")
    } else {
        EnvFilter::new("hintcrack=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
