//! Messages exchanged between the coordinator and its collaborators
//!
//! Every thread talks to the coordinator through a single `Event` channel.
//! The coordinator answers through per-collaborator command channels:
//! one mailbox per worker, one for the reader, one for the collector.

use crate::master::combinations::CandidateAlphabet;
use crate::master::pool::WorkerId;
use crate::master::registry::{PasswordRecord, RecordId};
use crossbeam_channel::Sender;
use std::sync::Arc;

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record ID
    pub id: RecordId,

    /// Owner name
    pub name: String,

    /// Characters the password may use
    pub alphabet: String,

    /// Password length
    pub password_length: usize,

    /// Hash of the password
    pub encrypted_password: String,

    /// Hashes of the hints, in column order
    pub hints: Vec<String>,
}

/// Crack one hint against one candidate alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintTask {
    pub record_id: RecordId,
    pub encrypted_hint: String,
    pub candidate: CandidateAlphabet,
}

/// Crack the password of a record whose hints are all known
///
/// Holds a snapshot; later hint replies for the same record never reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordTask {
    pub record: Arc<PasswordRecord>,
}

impl PasswordTask {
    pub fn new(snapshot: PasswordRecord) -> Self {
        Self {
            record: Arc::new(snapshot),
        }
    }
}

/// A dispatchable unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Hint(HintTask),
    Password(PasswordTask),
}

/// Coordinator -> worker
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    CrackHint(HintTask),
    CrackPassword(PasswordTask),
    Stop,
}

impl From<Task> for WorkerCommand {
    fn from(task: Task) -> Self {
        match task {
            Task::Hint(t) => WorkerCommand::CrackHint(t),
            Task::Password(t) => WorkerCommand::CrackPassword(t),
        }
    }
}

/// Coordinator -> ingestion reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderCommand {
    /// Send the next batch (empty once the input is exhausted)
    ReadBatch,

    /// Stop the reader thread
    Stop,
}

/// Coordinator -> report sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    /// Buffer a line of output
    Report(String),

    /// Write out everything buffered so far
    Flush,

    /// Flush and stop the collector thread
    Stop,
}

/// Everything the coordinator reacts to
#[derive(Debug)]
pub enum Event {
    /// Begin the run
    Start,

    /// Records from the reader; empty means end of input
    Batch(Vec<RawRecord>),

    /// A worker announced itself
    Register {
        worker: WorkerId,
        mailbox: Sender<WorkerCommand>,
    },

    /// A worker decrypted a hint
    HintResult {
        worker: WorkerId,
        record_id: RecordId,
        encrypted_hint: String,
        decrypted_hint: String,
    },

    /// A worker finished a password task; empty means no match
    ///
    /// Also frees the worker: no `Available` follows a password task.
    PasswordResult {
        worker: WorkerId,
        record_id: RecordId,
        decrypted_password: String,
    },

    /// A worker finished a hint task and is free
    Available { worker: WorkerId },

    /// A worker thread exited
    Terminated { worker: WorkerId },

    /// Operator asked to stop (Ctrl-C)
    Interrupt,
}

impl Event {
    /// Short variant name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Batch(_) => "batch",
            Event::Register { .. } => "register",
            Event::HintResult { .. } => "hint_result",
            Event::PasswordResult { .. } => "password_result",
            Event::Available { .. } => "available",
            Event::Terminated { .. } => "terminated",
            Event::Interrupt => "interrupt",
        }
    }
}
