//! Password file ingestion
//!
//! `BatchSource` turns delimited lines into `RawRecord` batches:
//!
//! ```text
//! ID;Name;PasswordChars;PasswordLength;Password;Hint1;...;HintN
//! 1;Sophia;ABCDEFGHIJK;10;c4712866...;1582824a...;e91d7d8b...
//! ```
//!
//! `BatchReader` runs a source on its own thread and answers the
//! coordinator's `ReadBatch` commands. Once the input is exhausted every
//! request gets an empty batch.

use crate::error::{InputError, WorkerError};
use crate::messages::{Event, RawRecord, ReaderCommand};
use crossbeam_channel::{unbounded, Sender};
use serde::Serialize;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Columns before the hints
const FIXED_FIELDS: [&str; 5] = ["ID", "Name", "PasswordChars", "PasswordLength", "Password"];

/// Parse one input line (`line` is 1-based, for error messages)
pub fn parse_line(text: &str, line: usize, delimiter: char) -> Result<RawRecord, InputError> {
    let mut fields = text.trim_end_matches(['\r', '\n']).split(delimiter);
    let mut next = |field: &'static str| {
        fields
            .next()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or(InputError::MissingField { line, field })
    };

    let id = next(FIXED_FIELDS[0])?;
    let id = id.parse().map_err(|_| InputError::InvalidNumber {
        line,
        field: FIXED_FIELDS[0],
        value: id.to_string(),
    })?;
    let name = next(FIXED_FIELDS[1])?.to_string();
    let alphabet = next(FIXED_FIELDS[2])?.to_string();
    let length = next(FIXED_FIELDS[3])?;
    let password_length = length.parse().map_err(|_| InputError::InvalidNumber {
        line,
        field: FIXED_FIELDS[3],
        value: length.to_string(),
    })?;
    let encrypted_password = next(FIXED_FIELDS[4])?.to_string();

    let hints = fields
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect();

    Ok(RawRecord {
        id,
        name,
        alphabet,
        password_length,
        encrypted_password,
        hints,
    })
}

/// Counters for one input file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Lines read, header included
    pub lines: u64,

    /// Records parsed
    pub records: u64,

    /// Lines that failed to parse
    pub malformed: u64,

    /// Non-empty batches produced
    pub batches: u64,
}

/// Reads records in batches from a buffered input
pub struct BatchSource<R> {
    input: R,
    delimiter: char,
    batch_size: usize,
    skip_header: bool,
    line_no: usize,
    exhausted: bool,
    buf: String,
    stats: ReaderStats,
}

impl<R: BufRead> BatchSource<R> {
    pub fn new(input: R, delimiter: char, batch_size: usize, has_header: bool) -> Self {
        Self {
            input,
            delimiter,
            batch_size: batch_size.max(1),
            skip_header: has_header,
            line_no: 0,
            exhausted: false,
            buf: String::new(),
            stats: ReaderStats::default(),
        }
    }

    /// Up to `batch_size` records; empty once the input is exhausted.
    ///
    /// Blank lines are skipped; malformed lines are logged and skipped.
    pub fn next_batch(&mut self) -> std::io::Result<Vec<RawRecord>> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while !self.exhausted && batch.len() < self.batch_size {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                self.exhausted = true;
                break;
            }
            self.line_no += 1;
            self.stats.lines += 1;

            if self.skip_header {
                self.skip_header = false;
                continue;
            }
            if self.buf.trim().is_empty() {
                continue;
            }

            match parse_line(&self.buf, self.line_no, self.delimiter) {
                Ok(record) => {
                    self.stats.records += 1;
                    batch.push(record);
                }
                Err(err) => {
                    self.stats.malformed += 1;
                    warn!(error = %err, "Skipping malformed line");
                }
            }
        }

        if !batch.is_empty() {
            self.stats.batches += 1;
        }
        Ok(batch)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }
}

/// Runs a `BatchSource` on its own thread
pub struct BatchReader {
    /// Thread handle
    handle: JoinHandle<ReaderStats>,

    /// Source of command sender clones; dropped in `join`
    commands: Sender<ReaderCommand>,
}

impl BatchReader {
    /// Spawn the reader thread; batches are sent to `events`
    pub fn spawn<R: BufRead + Send + 'static>(
        source: BatchSource<R>,
        events: Sender<Event>,
    ) -> Result<Self, WorkerError> {
        let (commands, receiver) = unbounded::<ReaderCommand>();

        let handle = thread::Builder::new()
            .name("reader".into())
            .spawn(move || {
                let mut source = source;
                for command in receiver.iter() {
                    if command == ReaderCommand::Stop {
                        debug!("Reader stopping");
                        break;
                    }

                    let batch = source.next_batch().unwrap_or_else(|e| {
                        error!(error = %e, "Input read failed; treating as end of input");
                        source.exhausted = true;
                        Vec::new()
                    });
                    debug!(size = batch.len(), "Sending batch");
                    if events.send(Event::Batch(batch)).is_err() {
                        break;
                    }
                }

                let stats = source.stats();
                info!(
                    records = stats.records,
                    malformed = stats.malformed,
                    batches = stats.batches,
                    "Reader finished"
                );
                stats
            })
            .map_err(|e| WorkerError::SpawnFailed {
                name: "reader".into(),
                reason: e.to_string(),
            })?;

        Ok(Self { handle, commands })
    }

    /// Channel for reader commands
    pub fn sender(&self) -> Sender<ReaderCommand> {
        self.commands.clone()
    }

    /// Wait for the reader thread; it exits on `Stop` or once every
    /// command sender is dropped
    pub fn join(self) -> Result<ReaderStats, WorkerError> {
        let BatchReader { handle, commands } = self;
        drop(commands);
        handle.join().map_err(|_| WorkerError::Panicked {
            name: "reader".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    const INPUT: &str = "ID;Name;PasswordChars;PasswordLength;Password;Hint1;Hint2\n\
                         1;Sophia;ABCD;3;aaa;h1;h2\n\
                         \n\
                         2;Jackson;ABCD;3;bbb;h3;h4\n\
                         x;Broken;ABCD;3;ccc;h5\n\
                         3;Emma;ABCD;3;ddd\n";

    #[test]
    fn test_parse_line() {
        let record = parse_line("7;Ava;ABC;2;pw;h1;h2;\r\n", 1, ';').unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.name, "Ava");
        assert_eq!(record.alphabet, "ABC");
        assert_eq!(record.password_length, 2);
        assert_eq!(record.encrypted_password, "pw");
        assert_eq!(record.hints, vec!["h1", "h2"]);
    }

    #[test]
    fn test_parse_line_errors() {
        assert_eq!(
            parse_line("7;Ava;ABC", 3, ';'),
            Err(InputError::MissingField {
                line: 3,
                field: "PasswordLength"
            })
        );
        assert_eq!(
            parse_line("7;Ava;ABC;two;pw", 4, ';'),
            Err(InputError::InvalidNumber {
                line: 4,
                field: "PasswordLength",
                value: "two".into()
            })
        );
    }

    #[test]
    fn test_batches_skip_header_blank_and_malformed() {
        let mut source = BatchSource::new(Cursor::new(INPUT), ';', 2, true);

        let first = source.next_batch().unwrap();
        assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let second = source.next_batch().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, 3);
        assert!(second[0].hints.is_empty());

        assert!(source.next_batch().unwrap().is_empty());
        assert!(source.is_exhausted());
        assert!(source.next_batch().unwrap().is_empty());

        let stats = source.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.batches, 2);
    }

    #[test]
    fn test_reader_thread_answers_requests() {
        let (events_tx, events) = unbounded();
        let source = BatchSource::new(Cursor::new(INPUT), ';', 10, true);
        let reader = BatchReader::spawn(source, events_tx).unwrap();
        let commands = reader.sender();

        commands.send(ReaderCommand::ReadBatch).unwrap();
        commands.send(ReaderCommand::ReadBatch).unwrap();
        commands.send(ReaderCommand::ReadBatch).unwrap();

        let sizes: Vec<usize> = (0..3)
            .map(|_| match events.recv_timeout(Duration::from_secs(5)).unwrap() {
                Event::Batch(batch) => batch.len(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(sizes, vec![3, 0, 0]);

        commands.send(ReaderCommand::Stop).unwrap();
        let stats = reader.join().unwrap();
        assert_eq!(stats.records, 3);
    }
}
