//! Configuration types for hintcrack
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch size limits
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Crack hint-protected passwords with a pool of worker threads
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hintcrack",
    version,
    about = "Crack hint-protected passwords with a pool of worker threads",
    long_about = "Reads password records (ID;Name;Alphabet;Length;PasswordHash;Hint1;...;HintN),\n\
                  cracks every hint by permuting candidate alphabets, then cracks each password\n\
                  over the characters its decrypted hints share. Hashes are SHA-256 hex.",
    after_help = "EXAMPLES:\n    \
        hintcrack passwords.csv\n    \
        hintcrack passwords.csv -w 16 -b 50 -o results.txt\n    \
        hintcrack passwords.csv --format json -q"
)]
pub struct CliArgs {
    /// Password file to crack
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM",
        env = "HINTCRACK_WORKERS"
    )]
    pub workers: usize,

    /// Records per batch pulled from the input
    #[arg(short = 'b', long, default_value = "100", value_name = "NUM")]
    pub batch_size: usize,

    /// Field delimiter of the input file
    #[arg(long, default_value = ";", value_name = "CHAR")]
    pub delimiter: char,

    /// The input has no header line
    #[arg(long)]
    pub no_header: bool,

    /// Write reports to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Format of the final run summary
    #[arg(long, value_enum, default_value = "text")]
    pub format: SummaryFormat,

    /// Quiet mode - suppress progress and summary output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// How the final summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Human readable, styled for terminals
    Text,

    /// One JSON document
    Json,
}

fn default_workers() -> usize {
    // Cracking is CPU bound: one worker per core
    num_cpus::get()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct CrackConfig {
    /// Password file
    pub input_path: PathBuf,

    /// Report file (stdout when unset)
    pub output_path: Option<PathBuf>,

    /// Number of worker threads
    pub worker_count: usize,

    /// Records per batch
    pub batch_size: usize,

    /// Input field delimiter
    pub delimiter: char,

    /// Whether the first input line is a header
    pub has_header: bool,

    /// Summary format
    pub summary_format: SummaryFormat,

    /// Show progress indicator and summary
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl CrackConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        // Validate batch size
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&args.batch_size) {
            return Err(ConfigError::InvalidBatchSize {
                size: args.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        // Hashes and alphabets are alphanumeric; a delimiter among them
        // would split fields apart
        if args.delimiter.is_alphanumeric() || matches!(args.delimiter, '\n' | '\r') {
            return Err(ConfigError::InvalidDelimiter {
                delimiter: args.delimiter,
                reason: "must not be alphanumeric or a line break".into(),
            });
        }

        if !args.input.is_file() {
            return Err(ConfigError::InputNotFound { path: args.input });
        }

        // Validate output path
        if let Some(output) = &args.output {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
            if output.is_dir() {
                return Err(ConfigError::InvalidOutputPath {
                    path: output.clone(),
                    reason: "Is a directory".into(),
                });
            }
        }

        Ok(Self {
            input_path: args.input,
            output_path: args.output,
            worker_count: args.workers,
            batch_size: args.batch_size,
            delimiter: args.delimiter,
            has_header: !args.no_header,
            summary_format: args.format,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}
