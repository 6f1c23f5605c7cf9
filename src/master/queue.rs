//! Hint and password task queues
//!
//! Two independent FIFO queues owned by the coordinator. The queues have
//! no priority logic of their own: the dispatch sweep in the worker pool
//! decides which one is drained first.

use crate::messages::{HintTask, PasswordTask, Task};
use serde::Serialize;
use std::collections::VecDeque;

/// Counters for the task queues
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Hint tasks ever enqueued
    pub hints_enqueued: u64,

    /// Password tasks ever enqueued
    pub passwords_enqueued: u64,

    /// Hint tasks handed out
    pub hints_dequeued: u64,

    /// Password tasks handed out
    pub passwords_dequeued: u64,

    /// Tasks put back after a failed hand-off
    pub requeued: u64,
}

/// The coordinator's two task queues
#[derive(Debug, Default)]
pub struct TaskQueue {
    /// Hint cracking work, in arrival order
    hints: VecDeque<HintTask>,

    /// Password cracking work, in arrival order
    passwords: VecDeque<PasswordTask>,

    /// Queue statistics
    stats: QueueStats,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_hint(&mut self, task: HintTask) {
        self.hints.push_back(task);
        self.stats.hints_enqueued += 1;
    }

    pub fn enqueue_password(&mut self, task: PasswordTask) {
        self.passwords.push_back(task);
        self.stats.passwords_enqueued += 1;
    }

    /// Next hint task, or `None` when the queue is empty
    pub fn dequeue_hint(&mut self) -> Option<HintTask> {
        let task = self.hints.pop_front()?;
        self.stats.hints_dequeued += 1;
        Some(task)
    }

    /// Next password task, or `None` when the queue is empty
    pub fn dequeue_password(&mut self) -> Option<PasswordTask> {
        let task = self.passwords.pop_front()?;
        self.stats.passwords_dequeued += 1;
        Some(task)
    }

    /// Return a task that could not be delivered to the head of its queue
    pub fn requeue_front(&mut self, task: Task) {
        match task {
            Task::Hint(t) => {
                self.hints.push_front(t);
                self.stats.hints_dequeued -= 1;
            }
            Task::Password(t) => {
                self.passwords.push_front(t);
                self.stats.passwords_dequeued -= 1;
            }
        }
        self.stats.requeued += 1;
    }

    /// True when neither queue holds work
    pub fn both_empty(&self) -> bool {
        self.hints.is_empty() && self.passwords.is_empty()
    }

    pub fn hint_len(&self) -> usize {
        self.hints.len()
    }

    pub fn password_len(&self) -> usize {
        self.passwords.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::registry::PasswordRecord;
    use std::sync::Arc;

    fn hint(record_id: u32, hint: &str) -> HintTask {
        HintTask {
            record_id,
            encrypted_hint: hint.into(),
            candidate: Arc::from(vec!['A', 'B']),
        }
    }

    fn password(id: u32) -> PasswordTask {
        PasswordTask::new(PasswordRecord::new(
            id,
            "alice".into(),
            "X".into(),
            vec![],
            Arc::from(vec!['A', 'B', 'C']),
            2,
        ))
    }

    #[test]
    fn test_queues_are_fifo_and_independent() {
        let mut queue = TaskQueue::new();
        assert!(queue.both_empty());

        queue.enqueue_hint(hint(1, "H1"));
        queue.enqueue_hint(hint(1, "H2"));
        queue.enqueue_password(password(7));
        assert!(!queue.both_empty());
        assert_eq!(queue.hint_len(), 2);
        assert_eq!(queue.password_len(), 1);

        assert_eq!(queue.dequeue_hint().unwrap().encrypted_hint, "H1");
        assert_eq!(queue.dequeue_password().unwrap().record.id(), 7);
        assert!(queue.dequeue_password().is_none());
        assert_eq!(queue.dequeue_hint().unwrap().encrypted_hint, "H2");
        assert!(queue.dequeue_hint().is_none());
        assert!(queue.both_empty());
    }

    #[test]
    fn test_requeue_front() {
        let mut queue = TaskQueue::new();
        queue.enqueue_hint(hint(1, "H1"));
        queue.enqueue_hint(hint(1, "H2"));

        let first = queue.dequeue_hint().unwrap();
        queue.requeue_front(Task::Hint(first));

        assert_eq!(queue.dequeue_hint().unwrap().encrypted_hint, "H1");
        let stats = queue.stats();
        assert_eq!(stats.hints_enqueued, 2);
        assert_eq!(stats.hints_dequeued, 1);
        assert_eq!(stats.requeued, 1);
    }
}
