//! Worker liveness monitoring
//!
//! Each worker thread owns a `LivenessGuard`. When the thread exits, by
//! returning or by unwinding from a panic, the guard tells the coordinator
//! with an `Event::Terminated`. The coordinator only reacts to identities
//! it is watching, which lets it unwatch workers it stops on purpose.

use crate::master::pool::WorkerId;
use crate::messages::Event;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::thread;
use tracing::debug;

/// Identities the coordinator wants termination notices for
#[derive(Debug, Default)]
pub struct LivenessMonitor {
    watched: HashSet<WorkerId>,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching a worker; returns false if it was already watched
    pub fn watch(&mut self, id: WorkerId) -> bool {
        self.watched.insert(id)
    }

    /// Stop watching a worker; returns false if it was not watched
    pub fn unwatch(&mut self, id: WorkerId) -> bool {
        self.watched.remove(&id)
    }

    pub fn is_watched(&self, id: WorkerId) -> bool {
        self.watched.contains(&id)
    }

    /// Stop watching every worker
    pub fn unwatch_all(&mut self) {
        self.watched.clear();
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }
}

/// RAII guard that reports a worker's termination
pub struct LivenessGuard {
    worker: WorkerId,
    events: Sender<Event>,
}

impl LivenessGuard {
    /// Create a guard for the calling worker thread
    pub fn new(worker: WorkerId, events: Sender<Event>) -> Self {
        Self { worker, events }
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!(worker = %self.worker, "Worker unwinding");
        }
        // The coordinator may already be gone during shutdown
        let _ = self.events.send(Event::Terminated {
            worker: self.worker,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_watch_unwatch() {
        let mut monitor = LivenessMonitor::new();
        assert!(monitor.watch(WorkerId(1)));
        assert!(!monitor.watch(WorkerId(1)));
        assert!(monitor.is_watched(WorkerId(1)));

        assert!(monitor.unwatch(WorkerId(1)));
        assert!(!monitor.unwatch(WorkerId(1)));
        assert!(monitor.is_empty());
    }

    #[test]
    fn test_guard_reports_on_drop() {
        let (tx, rx) = unbounded();
        drop(LivenessGuard::new(WorkerId(4), tx));

        match rx.try_recv() {
            Ok(Event::Terminated { worker }) => assert_eq!(worker, WorkerId(4)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_guard_reports_on_panic() {
        let (tx, rx) = unbounded();
        let handle = thread::spawn(move || {
            let _guard = LivenessGuard::new(WorkerId(2), tx);
            panic!("worker crashed");
        });
        assert!(handle.join().is_err());

        assert!(matches!(
            rx.try_recv(),
            Ok(Event::Terminated { worker: WorkerId(2) })
        ));
    }
}
