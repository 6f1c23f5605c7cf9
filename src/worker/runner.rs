//! Worker thread logic
//!
//! Each worker:
//! - Owns its mailbox and announces itself to the coordinator
//! - Cracks one task at a time with its `Cracker`
//! - Reports hint matches, then availability
//! - Reports password results, which also free it for new work
//! - Exits on `Stop` or when the coordinator drops its mailbox

use crate::error::WorkerError;
use crate::master::liveness::LivenessGuard;
use crate::master::pool::WorkerId;
use crate::messages::{Event, HintTask, PasswordTask, WorkerCommand};
use crate::worker::cracker::Cracker;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Hint tasks processed
    pub hints_tried: AtomicU64,

    /// Hint tasks that found a match
    pub hints_cracked: AtomicU64,

    /// Password tasks processed
    pub passwords_tried: AtomicU64,

    /// Password tasks that found a match
    pub passwords_cracked: AtomicU64,
}

impl WorkerStats {
    fn record_hint(&self, cracked: bool) {
        self.hints_tried.fetch_add(1, Ordering::Relaxed);
        if cracked {
            self.hints_cracked.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_password(&self, cracked: bool) {
        self.passwords_tried.fetch_add(1, Ordering::Relaxed);
        if cracked {
            self.passwords_cracked.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A worker thread that cracks tasks sent by the coordinator
pub struct Worker {
    /// Worker ID
    id: WorkerId,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), WorkerError>>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker thread that registers itself on `events`
    pub fn spawn<C: Cracker>(
        id: WorkerId,
        cracker: Arc<C>,
        events: Sender<Event>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);
        let name = id.to_string();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(id, cracker, events, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(WorkerError::Panicked {
                    name: self.id.to_string(),
                })
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop<C: Cracker>(
    id: WorkerId,
    cracker: Arc<C>,
    events: Sender<Event>,
    stats: Arc<WorkerStats>,
) -> Result<(), WorkerError> {
    // Reports termination however this function exits
    let _liveness = LivenessGuard::new(id, events.clone());

    let (mailbox_tx, mailbox): (Sender<WorkerCommand>, Receiver<WorkerCommand>) = unbounded();
    send(
        &events,
        Event::Register {
            worker: id,
            mailbox: mailbox_tx,
        },
    )?;
    debug!(worker = %id, "Worker registered");

    for command in mailbox.iter() {
        match command {
            WorkerCommand::CrackHint(task) => crack_hint(id, &*cracker, &task, &events, &stats)?,
            WorkerCommand::CrackPassword(task) => {
                crack_password(id, &*cracker, &task, &events, &stats)?
            }
            WorkerCommand::Stop => break,
        }
    }

    info!(
        worker = %id,
        hints = stats.hints_tried.load(Ordering::Relaxed),
        passwords = stats.passwords_tried.load(Ordering::Relaxed),
        "Worker shutting down"
    );
    Ok(())
}

fn crack_hint<C: Cracker>(
    id: WorkerId,
    cracker: &C,
    task: &HintTask,
    events: &Sender<Event>,
    stats: &WorkerStats,
) -> Result<(), WorkerError> {
    let decrypted = cracker.crack_hint(task);
    stats.record_hint(decrypted.is_some());

    if let Some(decrypted_hint) = decrypted {
        trace!(worker = %id, record = task.record_id, hint = %decrypted_hint, "Hint matched");
        send(
            events,
            Event::HintResult {
                worker: id,
                record_id: task.record_id,
                encrypted_hint: task.encrypted_hint.clone(),
                decrypted_hint,
            },
        )?;
    }
    send(events, Event::Available { worker: id })
}

fn crack_password<C: Cracker>(
    id: WorkerId,
    cracker: &C,
    task: &PasswordTask,
    events: &Sender<Event>,
    stats: &WorkerStats,
) -> Result<(), WorkerError> {
    let decrypted = cracker.crack_password(&task.record);
    stats.record_password(decrypted.is_some());

    send(
        events,
        Event::PasswordResult {
            worker: id,
            record_id: task.record.id(),
            decrypted_password: decrypted.unwrap_or_default(),
        },
    )
}

fn send(events: &Sender<Event>, event: Event) -> Result<(), WorkerError> {
    events.send(event).map_err(|_| WorkerError::EventsClosed)
}

/// Aggregate (hints tried, passwords tried) over several workers
pub fn aggregate_stats(stats: &[Arc<WorkerStats>]) -> (u64, u64) {
    stats.iter().fold((0, 0), |(hints, passwords), s| {
        (
            hints + s.hints_tried.load(Ordering::Relaxed),
            passwords + s.passwords_tried.load(Ordering::Relaxed),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::registry::PasswordRecord;
    use std::time::Duration;

    /// Matches hints equal to "hit" and cracks every password to "pw"
    struct FakeCracker;

    impl Cracker for FakeCracker {
        fn crack_hint(&self, task: &HintTask) -> Option<String> {
            (task.encrypted_hint == "hit").then(|| "ABC".to_string())
        }

        fn crack_password(&self, _record: &PasswordRecord) -> Option<String> {
            Some("pw".to_string())
        }
    }

    fn recv(rx: &Receiver<Event>) -> Event {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    fn spawn() -> (Worker, Sender<WorkerCommand>, Receiver<Event>) {
        let (tx, rx) = unbounded();
        let worker = Worker::spawn(WorkerId(1), Arc::new(FakeCracker), tx).unwrap();
        let mailbox = match recv(&rx) {
            Event::Register { worker, mailbox } => {
                assert_eq!(worker, WorkerId(1));
                mailbox
            }
            other => panic!("unexpected {:?}", other),
        };
        (worker, mailbox, rx)
    }

    fn hint(encrypted: &str) -> HintTask {
        HintTask {
            record_id: 2,
            encrypted_hint: encrypted.into(),
            candidate: Arc::from(vec!['A', 'B', 'C']),
        }
    }

    #[test]
    fn test_hint_reply_then_available() {
        let (worker, mailbox, rx) = spawn();

        mailbox.send(WorkerCommand::CrackHint(hint("hit"))).unwrap();
        assert!(matches!(
            recv(&rx),
            Event::HintResult { record_id: 2, ref decrypted_hint, .. } if decrypted_hint == "ABC"
        ));
        assert!(matches!(recv(&rx), Event::Available { worker: WorkerId(1) }));

        // A miss only frees the worker
        mailbox.send(WorkerCommand::CrackHint(hint("miss"))).unwrap();
        assert!(matches!(recv(&rx), Event::Available { .. }));

        mailbox.send(WorkerCommand::Stop).unwrap();
        worker.join().unwrap();
        assert!(matches!(recv(&rx), Event::Terminated { worker: WorkerId(1) }));
    }

    #[test]
    fn test_password_reply() {
        let (worker, mailbox, rx) = spawn();
        let record = PasswordRecord::new(9, "bob".into(), "X".into(), vec![], Arc::from(vec!['A']), 1);

        mailbox
            .send(WorkerCommand::CrackPassword(PasswordTask::new(record)))
            .unwrap();
        match recv(&rx) {
            Event::PasswordResult {
                record_id,
                decrypted_password,
                ..
            } => {
                assert_eq!(record_id, 9);
                assert_eq!(decrypted_password, "pw");
            }
            other => panic!("unexpected {:?}", other),
        }

        drop(mailbox);
        worker.join().unwrap();
        assert!(matches!(recv(&rx), Event::Terminated { .. }));
    }

    #[test]
    fn test_stats() {
        let stats = WorkerStats::default();
        stats.record_hint(true);
        stats.record_hint(false);
        stats.record_password(false);

        assert_eq!(stats.hints_tried.load(Ordering::Relaxed), 2);
        assert_eq!(stats.hints_cracked.load(Ordering::Relaxed), 1);
        assert_eq!(stats.passwords_tried.load(Ordering::Relaxed), 1);
        assert_eq!(stats.passwords_cracked.load(Ordering::Relaxed), 0);
    }
}
