//! Buffered report sink
//!
//! The collector runs in a dedicated thread and receives report lines from
//! the coordinator over a channel. Lines are buffered until a `Flush` and
//! then written in one go, so a batch summary and the lines before it reach
//! the output together.

use crate::error::{SinkError, WorkerError};
use crate::messages::SinkMessage;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Statistics about the report output
#[derive(Debug, Default)]
pub struct CollectorStats {
    /// Report lines received
    pub reports: AtomicU64,

    /// Flushes performed
    pub flushes: AtomicU64,

    /// Lines written to the output
    pub lines_written: AtomicU64,
}

impl CollectorStats {
    pub fn reports(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }
}

/// Report collector that runs in its own thread
pub struct Collector {
    /// Thread handle
    handle: JoinHandle<Result<(), SinkError>>,

    /// Source of sender clones; dropped in `finish`
    sender: Sender<SinkMessage>,

    /// Output statistics
    stats: Arc<CollectorStats>,
}

impl Collector {
    /// Spawn the collector thread writing to `output`
    pub fn spawn<W: Write + Send + 'static>(output: W) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded();
        let stats = Arc::new(CollectorStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("collector".into())
            .spawn(move || collector_thread(output, receiver, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                name: "collector".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle,
            sender,
            stats,
        })
    }

    /// Channel for report messages
    pub fn sender(&self) -> Sender<SinkMessage> {
        self.sender.clone()
    }

    /// Get output statistics
    pub fn stats(&self) -> Arc<CollectorStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the collector to write everything and exit
    ///
    /// The thread exits on `Stop` or once every sender is dropped.
    pub fn finish(self) -> Result<(), SinkError> {
        let Collector { handle, sender, .. } = self;
        drop(sender);

        handle.join().map_err(|_| SinkError::Panicked)?
    }
}

/// Internal collector thread function
fn collector_thread<W: Write>(
    mut output: W,
    receiver: Receiver<SinkMessage>,
    stats: Arc<CollectorStats>,
) -> Result<(), SinkError> {
    let mut pending: Vec<String> = Vec::new();

    for message in receiver.iter() {
        match message {
            SinkMessage::Report(line) => {
                stats.reports.fetch_add(1, Ordering::Relaxed);
                pending.push(line);
            }
            SinkMessage::Flush => write_pending(&mut output, &mut pending, &stats)?,
            SinkMessage::Stop => {
                debug!("Collector stopping");
                break;
            }
        }
    }

    if !pending.is_empty() {
        warn!(lines = pending.len(), "Writing reports that were never flushed");
    }
    write_pending(&mut output, &mut pending, &stats)
}

fn write_pending<W: Write>(
    output: &mut W,
    pending: &mut Vec<String>,
    stats: &CollectorStats,
) -> Result<(), SinkError> {
    for line in pending.drain(..) {
        writeln!(output, "{}", line)?;
        stats.lines_written.fetch_add(1, Ordering::Relaxed);
    }
    output.flush()?;
    stats.flushes.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writer that appends into shared memory
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_reports_written_on_flush() {
        let buf = SharedBuf::default();
        let collector = Collector::spawn(buf.clone()).unwrap();
        let tx = collector.sender();

        tx.send(SinkMessage::Report("one".into())).unwrap();
        tx.send(SinkMessage::Report("two".into())).unwrap();
        tx.send(SinkMessage::Flush).unwrap();
        tx.send(SinkMessage::Report("three".into())).unwrap();
        tx.send(SinkMessage::Stop).unwrap();

        let stats = collector.stats();
        collector.finish().unwrap();

        assert_eq!(buf.text(), "one\ntwo\nthree\n");
        assert_eq!(stats.reports(), 3);
        assert_eq!(stats.lines_written(), 3);
    }

    #[test]
    fn test_finish_without_stop() {
        let buf = SharedBuf::default();
        let collector = Collector::spawn(buf.clone()).unwrap();
        let tx = collector.sender();
        tx.send(SinkMessage::Report("late".into())).unwrap();
        drop(tx);

        collector.finish().unwrap();
        assert_eq!(buf.text(), "late\n");
    }
}
