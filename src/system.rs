//! Wiring for a complete cracking run
//!
//! `CrackSystem` is responsible for:
//! - Spawning the collector, reader and worker threads
//! - Running the coordinator on the calling thread
//! - Joining every thread once the coordinator terminates
//! - Assembling the final `RunSummary`

use crate::collector::Collector;
use crate::config::CrackConfig;
use crate::error::{Result, WorkerError};
use crate::master::coordinator::{Coordinator, CoordinatorStats};
use crate::master::pool::WorkerId;
use crate::master::queue::QueueStats;
use crate::master::registry::PasswordRecord;
use crate::messages::Event;
use crate::progress::ProgressCounters;
use crate::reader::{BatchReader, BatchSource, ReaderStats};
use crate::worker::{aggregate_stats, Cracker, Worker};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a completed run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Wall-clock time of the coordinator
    pub elapsed_ms: u64,

    /// Whether the run was interrupted
    pub interrupted: bool,

    /// Worker threads spawned
    pub workers: usize,

    /// Records read
    pub records: usize,

    /// Records whose password was found
    pub cracked: usize,

    /// Coordinator event counters
    pub coordinator: CoordinatorStats,

    /// Task queue counters
    pub queue: QueueStats,

    /// Input counters
    pub reader: ReaderStats,

    /// Report lines written by the collector
    pub reports_written: u64,

    /// Final state of every record, in ID order
    pub results: Vec<PasswordRecord>,
}

impl RunSummary {
    /// Fraction of records cracked
    pub fn success_rate(&self) -> f64 {
        if self.records > 0 {
            self.cracked as f64 / self.records as f64
        } else {
            0.0
        }
    }

    /// Summary as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Cloneable handle that interrupts a running system
#[derive(Clone)]
pub struct ShutdownHandle {
    events: Sender<Event>,
}

impl ShutdownHandle {
    /// Ask the coordinator to shut down
    pub fn interrupt(&self) {
        if self.events.send(Event::Interrupt).is_err() {
            debug!("Interrupt after the run ended");
        }
    }
}

/// A coordinator with its reader, collector and workers
pub struct CrackSystem<C: Cracker> {
    /// Validated configuration
    config: CrackConfig,

    /// Shared by every worker
    cracker: Arc<C>,

    /// Event channel into the coordinator
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,

    /// Counters for a progress display
    progress: Option<Arc<ProgressCounters>>,
}

impl<C: Cracker> CrackSystem<C> {
    /// Create a new system; nothing runs until `run`
    pub fn new(config: CrackConfig, cracker: C) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            cracker: Arc::new(cracker),
            events_tx,
            events_rx,
            progress: None,
        }
    }

    /// Publish live counters while running
    pub fn with_progress(mut self, counters: Arc<ProgressCounters>) -> Self {
        self.progress = Some(counters);
        self
    }

    /// Get a handle for signal handlers
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Run against the configured input and output files
    pub fn run(self) -> Result<RunSummary> {
        let input = BufReader::new(File::open(&self.config.input_path)?);

        let output: Box<dyn Write + Send> = match &self.config.output_path {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        };

        self.run_with(input, output)
    }

    /// Run against any input and output
    pub fn run_with<R, W>(self, input: R, output: W) -> Result<RunSummary>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let started_at = Utc::now();
        let CrackSystem {
            config,
            cracker,
            events_tx,
            events_rx,
            progress,
        } = self;

        info!(
            input = %config.input_path.display(),
            workers = config.worker_count,
            batch_size = config.batch_size,
            start_time = %started_at.to_rfc3339(),
            "Starting run"
        );

        let collector = Collector::spawn(output)?;
        let collector_stats = collector.stats();

        let source = BatchSource::new(
            input,
            config.delimiter,
            config.batch_size,
            config.has_header,
        );
        let reader = BatchReader::spawn(source, events_tx.clone())?;

        let workers = spawn_workers(config.worker_count, &cracker, &events_tx)?;
        // Workers, reader and shutdown handles keep the channel open
        drop(events_tx);

        let mut coordinator = Coordinator::new(reader.sender(), collector.sender());
        if let Some(counters) = progress {
            coordinator = coordinator.with_progress(counters);
        }
        let outcome = coordinator.run(&events_rx);

        // Discards queued events, closing the mailboxes of workers whose
        // registration arrived after shutdown
        drop(events_rx);

        // Reap every thread before reporting, even when the coordinator failed
        let worker_stats: Vec<_> = workers.iter().map(Worker::stats).collect();
        for worker in workers {
            let id = worker.id();
            match worker.join() {
                Ok(()) => {}
                Err(WorkerError::EventsClosed) => {
                    debug!(worker = %id, "Worker outlived the coordinator")
                }
                Err(e) => warn!(worker = %id, error = %e, "Worker failed to join cleanly"),
            }
        }
        let reader_stats = reader.join()?;
        collector.finish()?;

        let (hints_tried, passwords_tried) = aggregate_stats(&worker_stats);
        debug!(hints_tried, passwords_tried, "Workers joined");
        let report = outcome?;

        let cracked = report
            .records
            .iter()
            .filter(|r| r.decrypted_password().is_some())
            .count();

        Ok(RunSummary {
            started_at,
            elapsed_ms: report.elapsed.as_millis() as u64,
            interrupted: report.interrupted,
            workers: config.worker_count,
            records: report.records.len(),
            cracked,
            coordinator: report.stats,
            queue: report.queue,
            reader: reader_stats,
            reports_written: collector_stats.lines_written(),
            results: report.records,
        })
    }
}

fn spawn_workers<C: Cracker>(
    count: usize,
    cracker: &Arc<C>,
    events: &Sender<Event>,
) -> std::result::Result<Vec<Worker>, WorkerError> {
    let workers = (1..=count as u64)
        .map(|id| Worker::spawn(WorkerId(id), Arc::clone(cracker), events.clone()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(count = workers.len(), "Workers spawned");
    Ok(workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummaryFormat;
    use crate::worker::Sha256Cracker;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn config(workers: usize) -> CrackConfig {
        CrackConfig {
            input_path: PathBuf::from("memory"),
            output_path: None,
            worker_count: workers,
            batch_size: 2,
            delimiter: ';',
            has_header: false,
            summary_format: SummaryFormat::Text,
            show_progress: false,
            verbose: false,
        }
    }

    #[test]
    fn test_empty_input_terminates() {
        let system = CrackSystem::new(config(2), Sha256Cracker);
        let summary = system.run_with(Cursor::new(""), io::sink()).unwrap();

        assert_eq!(summary.records, 0);
        assert_eq!(summary.success_rate(), 0.0);
        assert!(!summary.interrupted);
    }

    #[test]
    fn test_summary_serializes() {
        let system = CrackSystem::new(config(1), Sha256Cracker);
        let summary = system.run_with(Cursor::new(""), io::sink()).unwrap();
        let json = summary.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"], 0);
        assert_eq!(value["workers"], 1);
        assert!(value["results"].as_array().unwrap().is_empty());
    }
}
