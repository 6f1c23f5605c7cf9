//! Cracking coordinator - the event loop that owns all run state
//!
//! The coordinator is responsible for:
//! - Pulling batches from the reader and turning records into hint tasks
//! - Tracking per-record convergence and unlocking password tasks
//! - Dispatching queued work to idle workers
//! - Reacting to worker registration, replies and termination
//! - Shutting the pipeline down once the input is exhausted and drained
//!
//! Every collaborator talks to the coordinator through one `Event` channel,
//! and `handle` is the only place state changes. Registry and pool errors
//! are coordination bugs: they are logged, counted and otherwise ignored.

use crate::error::CoordinatorError;
use crate::master::combinations::{self, CandidateAlphabet};
use crate::master::liveness::LivenessMonitor;
use crate::master::pool::{WorkerId, WorkerPool};
use crate::master::queue::{QueueStats, TaskQueue};
use crate::master::registry::{PasswordRecord, PasswordRegistry, RecordId};
use crate::messages::{
    Event, HintTask, PasswordTask, RawRecord, ReaderCommand, SinkMessage, WorkerCommand,
};
use crate::progress::ProgressCounters;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where the coordinator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// A batch has been requested (or the run has not started)
    AwaitingBatch,

    /// Working through the current batch
    Dispatching,

    /// Input exhausted, waiting for in-flight work
    Draining,

    /// Shutdown sequence done
    Terminated,
}

/// Event counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Non-empty batches received
    pub batches: u64,

    /// Batch requests sent to the reader
    pub batch_requests: u64,

    /// Records admitted into the registry
    pub records: u64,

    /// Hint tasks generated
    pub hint_tasks: u64,

    /// Password tasks generated
    pub password_tasks: u64,

    /// Hint replies recorded
    pub hints_cracked: u64,

    /// Passwords recorded
    pub passwords_cracked: u64,

    /// Password tasks that came back without a match
    pub passwords_not_found: u64,

    /// Workers that registered
    pub workers_registered: u64,

    /// Workers that terminated while watched
    pub workers_lost: u64,

    /// Tasks whose hand-off failed and were put back
    pub undeliverable: u64,

    /// Registry, pool and candidate errors seen by the event loop
    pub invariant_violations: u64,
}

/// Alphabet, length and candidates fixed by the first record of the run
#[derive(Debug)]
struct RunShape {
    alphabet: Arc<[char]>,
    password_length: usize,
    candidates: Vec<CandidateAlphabet>,
}

/// What a finished run leaves behind
#[derive(Debug)]
pub struct CoordinatorReport {
    /// Event counters
    pub stats: CoordinatorStats,

    /// Task queue counters
    pub queue: QueueStats,

    /// Final state of every record, in ID order
    pub records: Vec<PasswordRecord>,

    /// Wall-clock time from start to shutdown
    pub elapsed: Duration,

    /// Whether the run was cut short by an interrupt
    pub interrupted: bool,
}

/// Owns the registry, queues and worker pool of a run
pub struct Coordinator {
    /// Commands to the ingestion reader
    reader: Sender<ReaderCommand>,

    /// Report lines to the collector
    sink: Sender<SinkMessage>,

    /// Per-record state
    registry: PasswordRegistry,

    /// Hint and password tasks waiting for a worker
    queue: TaskQueue,

    /// Known workers and their availability
    pool: WorkerPool,

    /// Workers whose termination matters
    liveness: LivenessMonitor,

    /// Set by the first batch
    shape: Option<RunShape>,

    /// Current state
    state: RunState,

    /// At most one batch request is outstanding
    batch_requested: bool,

    /// Run start time
    started_at: Option<Instant>,

    /// Fixed at shutdown
    elapsed: Duration,

    /// Shutdown was caused by an interrupt
    interrupted: bool,

    /// Event counters
    stats: CoordinatorStats,

    /// Published after every event, when set
    progress: Option<Arc<ProgressCounters>>,
}

impl Coordinator {
    /// Create a coordinator wired to its reader and sink
    pub fn new(reader: Sender<ReaderCommand>, sink: Sender<SinkMessage>) -> Self {
        Self {
            reader,
            sink,
            registry: PasswordRegistry::new(),
            queue: TaskQueue::new(),
            pool: WorkerPool::new(),
            liveness: LivenessMonitor::new(),
            shape: None,
            state: RunState::AwaitingBatch,
            batch_requested: false,
            started_at: None,
            elapsed: Duration::ZERO,
            interrupted: false,
            stats: CoordinatorStats::default(),
            progress: None,
        }
    }

    /// Publish counters for a progress display
    pub fn with_progress(mut self, counters: Arc<ProgressCounters>) -> Self {
        self.progress = Some(counters);
        self
    }

    /// Start the run and process events until shutdown
    pub fn run(mut self, events: &Receiver<Event>) -> Result<CoordinatorReport, CoordinatorError> {
        self.handle(Event::Start)?;

        while !self.is_terminated() {
            let event = events.recv().map_err(|_| CoordinatorError::EventsClosed)?;
            self.handle(event)?;
            if let Some(progress) = &self.progress {
                progress.publish(&self.stats, self.pool.len());
            }
        }

        Ok(self.into_report())
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) -> Result<(), CoordinatorError> {
        if self.is_terminated() {
            debug!(event = event.kind(), "Ignoring event after shutdown");
            return Ok(());
        }

        match event {
            Event::Start => self.on_start(),
            Event::Batch(records) if records.is_empty() => self.on_end_of_input(),
            Event::Batch(records) => self.on_batch(records),
            Event::Register { worker, mailbox } => {
                self.on_register(worker, mailbox);
                Ok(())
            }
            Event::HintResult {
                worker,
                record_id,
                encrypted_hint,
                decrypted_hint,
            } => self.on_hint_result(worker, record_id, &encrypted_hint, &decrypted_hint),
            Event::PasswordResult {
                worker,
                record_id,
                decrypted_password,
            } => self.on_password_result(worker, record_id, &decrypted_password),
            Event::Available { worker } => self.on_available(worker),
            Event::Terminated { worker } => self.on_terminated(worker),
            Event::Interrupt => {
                warn!("Interrupted, shutting down");
                self.interrupted = true;
                self.shutdown()
            }
        }
    }

    fn on_start(&mut self) -> Result<(), CoordinatorError> {
        if self.started_at.is_some() {
            debug!("Ignoring repeated start");
            return Ok(());
        }
        self.started_at = Some(Instant::now());
        info!("Coordinator started");
        self.request_batch()
    }

    fn on_batch(&mut self, records: Vec<RawRecord>) -> Result<(), CoordinatorError> {
        self.batch_requested = false;
        if self.state == RunState::Draining {
            debug!(size = records.len(), "Ignoring batch after end of input");
            return Ok(());
        }
        self.state = RunState::Dispatching;
        self.stats.batches += 1;

        let size = records.len();
        if self.shape.is_none() {
            self.fix_shape(&records[0]);
        }

        for raw in records {
            let id = raw.id;
            if let Err(err) = self.admit(raw) {
                self.violation(&err, id, "Could not admit record");
            }
        }

        info!(
            size,
            hints_queued = self.queue.hint_len(),
            passwords_queued = self.queue.password_len(),
            "Batch admitted"
        );

        self.dispatch();
        self.report(format!("Processed batch of size {}", size))?;
        self.flush()?;

        // No reply will follow a batch that queued nothing
        if self.queue.both_empty() {
            self.request_batch()?;
        }
        Ok(())
    }

    /// Capture the run's alphabet and length and precompute candidates
    fn fix_shape(&mut self, first: &RawRecord) {
        let alphabet: Arc<[char]> = first.alphabet.chars().collect();
        let password_length = first.password_length;

        let candidates = match combinations::generate(&alphabet, password_length) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(error = %err, "No candidate alphabets; hints cannot be cracked");
                self.stats.invariant_violations += 1;
                Vec::new()
            }
        };

        info!(
            alphabet = %first.alphabet,
            password_length,
            candidates = candidates.len(),
            "Run shape fixed by first record"
        );

        self.shape = Some(RunShape {
            alphabet,
            password_length,
            candidates,
        });
    }

    /// Create the record and queue its tasks
    fn admit(&mut self, raw: RawRecord) -> Result<(), crate::error::RegistryError> {
        let Some(shape) = self.shape.as_ref() else {
            return Ok(());
        };

        if raw.password_length != shape.password_length
            || raw.alphabet.chars().ne(shape.alphabet.iter().copied())
        {
            warn!(record = raw.id, "Record shape differs from the run; using the run's");
        }

        let record = self.registry.create(
            raw.id,
            raw.name,
            raw.encrypted_password,
            raw.hints,
            Arc::clone(&shape.alphabet),
            shape.password_length,
        )?;
        self.stats.records += 1;

        for hint in record.encrypted_hints() {
            for candidate in &shape.candidates {
                self.queue.enqueue_hint(HintTask {
                    record_id: record.id(),
                    encrypted_hint: hint.to_string(),
                    candidate: Arc::clone(candidate),
                });
                self.stats.hint_tasks += 1;
            }
        }

        if record.all_hints_resolved() {
            debug!(record = record.id(), "Record has no hints; password task queued");
            self.queue.enqueue_password(PasswordTask::new(record.clone()));
            self.stats.password_tasks += 1;
        }
        Ok(())
    }

    fn on_end_of_input(&mut self) -> Result<(), CoordinatorError> {
        self.batch_requested = false;
        if self.state == RunState::Draining {
            debug!("Ignoring repeated end of input");
            return Ok(());
        }

        info!(
            busy = self.pool.busy_count(),
            hints_queued = self.queue.hint_len(),
            passwords_queued = self.queue.password_len(),
            "Input exhausted, draining"
        );
        self.flush()?;
        self.state = RunState::Draining;
        self.finish_if_drained()
    }

    fn on_register(&mut self, worker: WorkerId, mailbox: Sender<WorkerCommand>) {
        if let Err(err) = self.pool.register(worker, mailbox) {
            self.violation(&err, 0, "Registration rejected");
            return;
        }
        self.liveness.watch(worker);
        self.stats.workers_registered += 1;
        info!(worker = %worker, workers = self.pool.len(), "Worker registered");

        self.dispatch();
    }

    fn on_hint_result(
        &mut self,
        worker: WorkerId,
        record_id: RecordId,
        encrypted_hint: &str,
        decrypted_hint: &str,
    ) -> Result<(), CoordinatorError> {
        debug!(worker = %worker, record = record_id, hint = decrypted_hint, "Hint cracked");

        match self.resolve_hint(record_id, encrypted_hint, decrypted_hint) {
            Ok(true) => {
                let snapshot = self.registry.snapshot(record_id);
                match snapshot {
                    Ok(snapshot) => {
                        info!(record = record_id, "All hints cracked; password task queued");
                        self.queue.enqueue_password(PasswordTask::new(snapshot));
                        self.stats.password_tasks += 1;
                    }
                    Err(err) => self.violation(&err, record_id, "Could not snapshot record"),
                }
            }
            Ok(false) => {}
            Err(err) => self.violation(&err, record_id, "Could not record hint"),
        }

        self.after_progress()
    }

    /// Record a hint; true when this reply resolved the record's last hint
    fn resolve_hint(
        &mut self,
        record_id: RecordId,
        encrypted_hint: &str,
        decrypted_hint: &str,
    ) -> Result<bool, crate::error::RegistryError> {
        let was_resolved = self.registry.all_hints_resolved(record_id)?;
        self.registry
            .record_hint(record_id, encrypted_hint, decrypted_hint)?;
        self.stats.hints_cracked += 1;
        Ok(!was_resolved && self.registry.all_hints_resolved(record_id)?)
    }

    fn on_password_result(
        &mut self,
        worker: WorkerId,
        record_id: RecordId,
        decrypted_password: &str,
    ) -> Result<(), CoordinatorError> {
        if let Err(err) = self.pool.mark_idle(worker) {
            self.violation(&err, record_id, "Password result from unknown worker");
        }

        match self.registry.record_password(record_id, decrypted_password) {
            Ok(true) => {
                self.stats.passwords_cracked += 1;
                let name = self
                    .registry
                    .get(record_id)
                    .map(|r| r.name().to_string())
                    .unwrap_or_default();
                info!(worker = %worker, record = record_id, "Password cracked");
                self.report(format!(
                    "Decrypted Password from {} with ID {}: {}",
                    name, record_id, decrypted_password
                ))?;
                self.flush()?;
            }
            Ok(false) if decrypted_password.is_empty() => {
                self.stats.passwords_not_found += 1;
                warn!(worker = %worker, record = record_id, "No password found; record stays unresolved");
            }
            Ok(false) => {}
            Err(err) => self.violation(&err, record_id, "Could not record password"),
        }

        self.after_progress()
    }

    fn on_available(&mut self, worker: WorkerId) -> Result<(), CoordinatorError> {
        if let Err(err) = self.pool.mark_idle(worker) {
            self.violation(&err, 0, "Availability from unknown worker");
        }
        self.after_progress()
    }

    fn on_terminated(&mut self, worker: WorkerId) -> Result<(), CoordinatorError> {
        if !self.liveness.unwatch(worker) {
            debug!(worker = %worker, "Ignoring termination of unwatched worker");
            return Ok(());
        }

        if let Err(err) = self.pool.remove(worker) {
            self.violation(&err, 0, "Terminated worker was not in the pool");
        }
        self.stats.workers_lost += 1;
        warn!(worker = %worker, remaining = self.pool.len(), "Worker terminated");

        if self.pool.is_empty() {
            error!("No workers left, shutting down");
            return self.shutdown();
        }
        self.finish_if_drained()
    }

    /// Sweep, pull more input when the queues run dry, finish when drained
    fn after_progress(&mut self) -> Result<(), CoordinatorError> {
        self.dispatch();
        if self.queue.both_empty() {
            self.request_batch()?;
        }
        self.finish_if_drained()
    }

    fn dispatch(&mut self) {
        let report = self.pool.dispatch(&mut self.queue);
        self.stats.undeliverable += report.undeliverable as u64;
    }

    fn request_batch(&mut self) -> Result<(), CoordinatorError> {
        if self.batch_requested
            || !matches!(self.state, RunState::AwaitingBatch | RunState::Dispatching)
        {
            return Ok(());
        }

        self.reader
            .send(ReaderCommand::ReadBatch)
            .map_err(|_| CoordinatorError::ReaderClosed)?;
        self.batch_requested = true;
        self.state = RunState::AwaitingBatch;
        self.stats.batch_requests += 1;
        debug!("Requested next batch");
        Ok(())
    }

    fn finish_if_drained(&mut self) -> Result<(), CoordinatorError> {
        if self.state != RunState::Draining {
            return Ok(());
        }
        let idle = self.queue.both_empty() && self.pool.busy_count() == 0;
        if idle || self.pool.is_empty() {
            return self.shutdown();
        }
        Ok(())
    }

    /// Stop workers and reader, dump the registry and stop the sink
    fn shutdown(&mut self) -> Result<(), CoordinatorError> {
        self.elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.state = RunState::Terminated;

        self.liveness.unwatch_all();
        self.pool.broadcast(WorkerCommand::Stop);

        if self.reader.send(ReaderCommand::Stop).is_err() {
            debug!("Reader already stopped");
        }

        let records = self.registry.records();
        let lines: Vec<String> = std::iter::once(format!(
            "Password registry ({} of {} cracked):",
            self.registry.cracked_count(),
            self.registry.len()
        ))
        .chain(records.iter().map(|r| r.to_string()))
        .chain(std::iter::once(format!(
            "Finished in {} ms",
            self.elapsed.as_millis()
        )))
        .collect();
        for line in lines {
            self.report(line)?;
        }
        self.flush()?;
        self.sink
            .send(SinkMessage::Stop)
            .map_err(|_| CoordinatorError::SinkClosed)?;

        info!(
            records = self.registry.len(),
            cracked = self.registry.cracked_count(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            interrupted = self.interrupted,
            "Run finished"
        );
        Ok(())
    }

    fn report(&self, line: String) -> Result<(), CoordinatorError> {
        self.sink
            .send(SinkMessage::Report(line))
            .map_err(|_| CoordinatorError::SinkClosed)
    }

    fn flush(&self) -> Result<(), CoordinatorError> {
        self.sink
            .send(SinkMessage::Flush)
            .map_err(|_| CoordinatorError::SinkClosed)
    }

    fn violation(&mut self, err: &dyn fmt::Display, record: RecordId, context: &'static str) {
        self.stats.invariant_violations += 1;
        error!(error = %err, record, "{}", context);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == RunState::Terminated
    }

    pub fn registry(&self) -> &PasswordRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Candidate alphabets of the run, once the first batch arrived
    pub fn candidates(&self) -> Option<&[CandidateAlphabet]> {
        self.shape.as_ref().map(|s| s.candidates.as_slice())
    }

    fn into_report(self) -> CoordinatorReport {
        CoordinatorReport {
            stats: self.stats,
            queue: self.queue.stats(),
            records: self.registry.records().into_iter().cloned().collect(),
            elapsed: self.elapsed,
            interrupted: self.interrupted,
        }
    }
}
