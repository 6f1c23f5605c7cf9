//! Worker pool with availability tracking
//!
//! Workers are keyed by identity in an ordered map. Each slot carries its
//! own availability flag and mailbox, so removing one worker never shifts
//! another worker's state. The dispatch sweep visits idle workers in
//! identity order and is the only place tasks are handed out.

use crate::error::{PoolError, PoolResult};
use crate::master::queue::TaskQueue;
use crate::messages::{Task, WorkerCommand};
use crossbeam_channel::Sender;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Identity of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Coordinator bookkeeping for one worker
#[derive(Debug)]
pub struct WorkerSlot {
    /// Command channel to the worker thread
    mailbox: Sender<WorkerCommand>,

    /// Whether the worker currently holds a task
    busy: bool,

    /// Tasks handed to this worker so far
    assigned: u64,
}

/// Outcome of one dispatch sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Password tasks handed out
    pub passwords: usize,

    /// Hint tasks handed out
    pub hints: usize,

    /// Tasks put back because the worker's mailbox was closed
    pub undeliverable: usize,
}

impl DispatchReport {
    /// Total tasks handed out
    pub fn dispatched(&self) -> usize {
        self.passwords + self.hints
    }
}

/// Known workers and their availability
#[derive(Debug, Default)]
pub struct WorkerPool {
    slots: BTreeMap<WorkerId, WorkerSlot>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker as idle
    pub fn register(&mut self, id: WorkerId, mailbox: Sender<WorkerCommand>) -> PoolResult<()> {
        if self.slots.contains_key(&id) {
            return Err(PoolError::AlreadyRegistered { id });
        }
        self.slots.insert(
            id,
            WorkerSlot {
                mailbox,
                busy: false,
                assigned: 0,
            },
        );
        Ok(())
    }

    pub fn mark_busy(&mut self, id: WorkerId) -> PoolResult<()> {
        self.slot_mut(id)?.busy = true;
        Ok(())
    }

    pub fn mark_idle(&mut self, id: WorkerId) -> PoolResult<()> {
        self.slot_mut(id)?.busy = false;
        Ok(())
    }

    /// Drop a worker. Whatever task it held is abandoned.
    pub fn remove(&mut self, id: WorkerId) -> PoolResult<()> {
        match self.slots.remove(&id) {
            Some(slot) => {
                if slot.busy {
                    warn!(worker = %id, "Removed worker while it held a task; the task is lost");
                }
                Ok(())
            }
            None => Err(PoolError::UnknownWorker { id }),
        }
    }

    /// Hand queued tasks to idle workers, password tasks first.
    ///
    /// Each idle worker receives at most one task per sweep. The sweep ends
    /// when no idle worker is left or both queues are empty.
    pub fn dispatch(&mut self, queue: &mut TaskQueue) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (id, slot) in self.slots.iter_mut().filter(|(_, s)| !s.busy) {
            let task = match queue.dequeue_password() {
                Some(t) => Task::Password(t),
                None => match queue.dequeue_hint() {
                    Some(t) => Task::Hint(t),
                    None => break,
                },
            };
            let is_password = matches!(task, Task::Password(_));

            match slot.mailbox.send(task.into()) {
                Ok(()) => {
                    slot.busy = true;
                    slot.assigned += 1;
                    if is_password {
                        report.passwords += 1;
                    } else {
                        report.hints += 1;
                    }
                }
                Err(err) => {
                    // Mailbox closed: the worker is gone and its termination
                    // event is on the way. Keep it busy until then.
                    warn!(worker = %id, "Worker mailbox closed; returning task to the queue");
                    let task = match err.into_inner() {
                        WorkerCommand::CrackHint(t) => Task::Hint(t),
                        WorkerCommand::CrackPassword(t) => Task::Password(t),
                        WorkerCommand::Stop => continue,
                    };
                    queue.requeue_front(task);
                    slot.busy = true;
                    report.undeliverable += 1;
                }
            }
        }

        if report.dispatched() > 0 {
            debug!(
                passwords = report.passwords,
                hints = report.hints,
                idle = self.idle_count(),
                "Dispatch sweep"
            );
        }

        report
    }

    /// Send a command to every worker, ignoring closed mailboxes
    pub fn broadcast(&self, command: WorkerCommand) {
        for (id, slot) in &self.slots {
            if slot.mailbox.send(command.clone()).is_err() {
                debug!(worker = %id, "Mailbox already closed");
            }
        }
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Whether the worker is registered and idle
    pub fn is_idle(&self, id: WorkerId) -> bool {
        self.slots.get(&id).is_some_and(|s| !s.busy)
    }

    /// Tasks handed to a worker so far
    pub fn assigned(&self, id: WorkerId) -> Option<u64> {
        self.slots.get(&id).map(|s| s.assigned)
    }

    /// Registered identities in dispatch order
    pub fn identities(&self) -> Vec<WorkerId> {
        self.slots.keys().copied().collect()
    }

    pub fn idle_count(&self) -> usize {
        self.slots.values().filter(|s| !s.busy).count()
    }

    pub fn busy_count(&self) -> usize {
        self.slots.values().filter(|s| s.busy).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, id: WorkerId) -> PoolResult<&mut WorkerSlot> {
        self.slots
            .get_mut(&id)
            .ok_or(PoolError::UnknownWorker { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::registry::PasswordRecord;
    use crate::messages::{HintTask, PasswordTask};
    use crossbeam_channel::{unbounded, Receiver};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn hint(n: usize) -> HintTask {
        HintTask {
            record_id: 1,
            encrypted_hint: format!("H{}", n),
            candidate: Arc::from(vec!['A', 'B', 'C']),
        }
    }

    fn password(id: u32) -> PasswordTask {
        PasswordTask::new(PasswordRecord::new(
            id,
            "alice".into(),
            "X".into(),
            vec![],
            Arc::from(vec!['A', 'B', 'C', 'D']),
            3,
        ))
    }

    fn register(pool: &mut WorkerPool, id: u64) -> Receiver<WorkerCommand> {
        let (tx, rx) = unbounded();
        pool.register(WorkerId(id), tx).unwrap();
        rx
    }

    #[test]
    fn test_register_and_availability() {
        let mut pool = WorkerPool::new();
        let _rx = register(&mut pool, 1);

        assert!(pool.is_idle(WorkerId(1)));
        pool.mark_busy(WorkerId(1)).unwrap();
        assert!(!pool.is_idle(WorkerId(1)));
        pool.mark_idle(WorkerId(1)).unwrap();
        assert!(pool.is_idle(WorkerId(1)));

        let (tx, _) = unbounded();
        assert_eq!(
            pool.register(WorkerId(1), tx),
            Err(PoolError::AlreadyRegistered { id: WorkerId(1) })
        );
        assert_eq!(
            pool.mark_busy(WorkerId(9)),
            Err(PoolError::UnknownWorker { id: WorkerId(9) })
        );
        assert_eq!(
            pool.remove(WorkerId(9)),
            Err(PoolError::UnknownWorker { id: WorkerId(9) })
        );
    }

    #[test]
    fn test_removal_does_not_shift_other_flags() {
        let mut pool = WorkerPool::new();
        let _rx: Vec<_> = (1..=3).map(|i| register(&mut pool, i)).collect();

        pool.mark_busy(WorkerId(3)).unwrap();
        pool.remove(WorkerId(1)).unwrap();

        assert!(pool.is_idle(WorkerId(2)));
        assert!(!pool.is_idle(WorkerId(3)));
        assert_eq!(pool.identities(), vec![WorkerId(2), WorkerId(3)]);
    }

    #[test]
    fn test_interleaved_register_remove_stays_consistent() {
        let mut pool = WorkerPool::new();
        let mut expected = HashSet::new();
        let mut receivers = Vec::new();

        // Deterministic pseudo-random interleaving
        let mut state = 0x2545_f491_u64;
        for _ in 0..500 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let id = WorkerId(state % 16);

            if expected.contains(&id) && state % 3 == 0 {
                pool.remove(id).unwrap();
                expected.remove(&id);
            } else if expected.contains(&id) {
                let (tx, _) = unbounded();
                assert!(pool.register(id, tx).is_err());
            } else {
                let (tx, rx) = unbounded();
                pool.register(id, tx).unwrap();
                receivers.push(rx);
                expected.insert(id);
            }

            assert_eq!(pool.len(), expected.len());
            let ids: HashSet<_> = pool.identities().into_iter().collect();
            assert_eq!(ids, expected);
            assert_eq!(pool.idle_count() + pool.busy_count(), pool.len());
        }
    }

    #[test]
    fn test_dispatch_prefers_passwords_and_gives_one_task_each() {
        let mut pool = WorkerPool::new();
        let rx: Vec<_> = (1..=3).map(|i| register(&mut pool, i)).collect();

        let mut queue = TaskQueue::new();
        for n in 0..5 {
            queue.enqueue_hint(hint(n));
        }
        queue.enqueue_password(password(7));

        let report = pool.dispatch(&mut queue);
        assert_eq!(report.passwords, 1);
        assert_eq!(report.hints, 2);
        assert_eq!(pool.busy_count(), 3);
        assert_eq!(queue.hint_len(), 3);

        // Worker 1 got the password task, the others one hint each
        assert!(matches!(rx[0].try_recv(), Ok(WorkerCommand::CrackPassword(_))));
        assert!(matches!(rx[1].try_recv(), Ok(WorkerCommand::CrackHint(_))));
        assert!(matches!(rx[2].try_recv(), Ok(WorkerCommand::CrackHint(_))));
        for r in &rx {
            assert!(r.try_recv().is_err());
        }

        // No idle workers: nothing moves
        let report = pool.dispatch(&mut queue);
        assert_eq!(report.dispatched(), 0);
        assert_eq!(queue.hint_len(), 3);
    }

    #[test]
    fn test_dispatch_stops_when_queues_empty() {
        let mut pool = WorkerPool::new();
        let rx: Vec<_> = (1..=3).map(|i| register(&mut pool, i)).collect();

        let mut queue = TaskQueue::new();
        queue.enqueue_hint(hint(0));

        let report = pool.dispatch(&mut queue);
        assert_eq!(report.dispatched(), 1);
        assert_eq!(pool.busy_count(), 1);

        // Busy flag is only set alongside a delivered task
        for (i, r) in rx.iter().enumerate() {
            let got_task = r.try_recv().is_ok();
            assert_eq!(got_task, !pool.is_idle(WorkerId(i as u64 + 1)));
        }
        assert!(!pool.is_idle(WorkerId(1)));
    }

    #[test]
    fn test_dispatch_requeues_on_closed_mailbox() {
        let mut pool = WorkerPool::new();
        let rx = register(&mut pool, 1);
        drop(rx);
        let rx2 = register(&mut pool, 2);

        let mut queue = TaskQueue::new();
        queue.enqueue_hint(hint(0));

        let report = pool.dispatch(&mut queue);
        assert_eq!(report.undeliverable, 1);
        assert_eq!(report.hints, 1);
        assert!(!pool.is_idle(WorkerId(1)));

        // Worker 2 picked up the task worker 1 could not take
        match rx2.try_recv() {
            Ok(WorkerCommand::CrackHint(t)) => assert_eq!(t.encrypted_hint, "H0"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(queue.both_empty());
        assert_eq!(pool.assigned(WorkerId(1)), Some(0));
        assert_eq!(pool.assigned(WorkerId(2)), Some(1));
    }
}
