//! Progress reporting for a cracking run
//!
//! Provides a live spinner using indicatif and the styled final summary.

use crate::master::coordinator::CoordinatorStats;
use crate::system::RunSummary;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Counters the coordinator publishes for the progress display
#[derive(Debug, Default)]
pub struct ProgressCounters {
    /// Records admitted
    pub records: AtomicU64,

    /// Hints decrypted
    pub hints_cracked: AtomicU64,

    /// Passwords decrypted
    pub passwords_cracked: AtomicU64,

    /// Registered workers still alive
    pub workers: AtomicU64,
}

impl ProgressCounters {
    /// Copy the latest coordinator numbers
    pub fn publish(&self, stats: &CoordinatorStats, workers: usize) {
        self.records.store(stats.records, Ordering::Relaxed);
        self.hints_cracked.store(stats.hints_cracked, Ordering::Relaxed);
        self.passwords_cracked
            .store(stats.passwords_cracked, Ordering::Relaxed);
        self.workers.store(workers as u64, Ordering::Relaxed);
    }

    fn message(&self) -> String {
        format!(
            "Records: {} | Hints: {} | Passwords: {} | Workers: {}",
            format_number(self.records.load(Ordering::Relaxed)),
            format_number(self.hints_cracked.load(Ordering::Relaxed)),
            format_number(self.passwords_cracked.load(Ordering::Relaxed)),
            self.workers.load(Ordering::Relaxed),
        )
    }
}

/// Progress reporter that displays run status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,

    /// Stop signal for the updater thread
    stop: Arc<AtomicBool>,

    /// Thread refreshing the message from counters
    updater: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            stop: Arc::new(AtomicBool::new(false)),
            updater: None,
        }
    }

    /// Refresh the message from `counters` until finished
    pub fn watch(&mut self, counters: Arc<ProgressCounters>) {
        let bar = self.bar.clone();
        let stop = Arc::clone(&self.stop);

        self.updater = thread::Builder::new()
            .name("progress".into())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    bar.set_message(counters.message());
                    thread::sleep(Duration::from_millis(200));
                }
            })
            .ok();
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&mut self, message: &str) {
        self.stop_updater();
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&mut self) {
        self.stop_updater();
        self.bar.finish_and_clear();
    }

    fn stop_updater(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.updater.take() {
            if handle.join().is_err() {
                debug!("Progress updater panicked");
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(summary: &RunSummary) {
    let duration_secs = summary.elapsed_ms as f64 / 1000.0;
    let title = if summary.interrupted {
        style("Run Interrupted").yellow().bold()
    } else {
        style("Run Complete").green().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Started:").bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {} {}",
        style("Records:").bold(),
        format_number(summary.records as u64)
    );
    println!(
        "  {} {} ({:.1}%)",
        style("Cracked:").bold(),
        format_number(summary.cracked as u64),
        summary.success_rate() * 100.0
    );
    println!(
        "  {} {} of {} tasks",
        style("Hints:").bold(),
        format_number(summary.coordinator.hints_cracked),
        format_number(summary.coordinator.hint_tasks)
    );
    println!("  {} {}", style("Workers:").bold(), summary.workers);
    println!("  {} {:.1}s", style("Duration:").bold(), duration_secs);
    if summary.reader.malformed > 0 {
        println!(
            "  {} {}",
            style("Malformed lines:").yellow().bold(),
            format_number(summary.reader.malformed)
        );
    }
    if summary.coordinator.workers_lost > 0 {
        println!(
            "  {} {}",
            style("Workers lost:").yellow().bold(),
            summary.coordinator.workers_lost
        );
    }
    if summary.coordinator.invariant_violations > 0 {
        println!(
            "  {} {}",
            style("Invariant violations:").red().bold(),
            summary.coordinator.invariant_violations
        );
    }
    println!();
}

/// Print a header at the start of the run
pub fn print_header(input: &str, workers: usize, output: &str) {
    println!();
    println!(
        "{} {}",
        style("hintcrack").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_finish_survives_panicked_updater() {
        let mut reporter = ProgressReporter::new();
        reporter.updater = Some(thread::spawn(|| panic!("updater failed")));

        reporter.finish_and_clear();
        assert!(reporter.updater.is_none());
        assert!(reporter.stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_counters_message() {
        let counters = ProgressCounters::default();
        let stats = CoordinatorStats {
            records: 1200,
            hints_cracked: 30,
            passwords_cracked: 4,
            ..Default::default()
        };
        counters.publish(&stats, 8);

        assert_eq!(
            counters.message(),
            "Records: 1,200 | Hints: 30 | Passwords: 4 | Workers: 8"
        );
    }
}
