//! Cracking coordinator and the state it owns
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────┐  Batch   ┌───────────────────────────────┐  Report  ┌───────────┐
//!   │  Reader  ├─────────►│          Coordinator          ├─────────►│ Collector │
//!   └──────────┘◄─────────┤  registry · queue · pool      │          └───────────┘
//!                ReadBatch│  liveness · candidates        │
//!                         └──────┬─────────────────▲──────┘
//!                   CrackHint /  │                 │  HintResult / PasswordResult
//!                CrackPassword   │                 │  Available / Terminated
//!                         ┌──────▼─────┐     ┌─────┴──────┐
//!                         │  Worker 1  │ ... │  Worker N  │
//!                         └────────────┘     └────────────┘
//! ```

pub mod combinations;
pub mod coordinator;
pub mod liveness;
pub mod pool;
pub mod queue;
pub mod registry;

pub use combinations::{candidate_count, generate, CandidateAlphabet};
pub use coordinator::{Coordinator, CoordinatorReport, CoordinatorStats, RunState};
pub use liveness::{LivenessGuard, LivenessMonitor};
pub use pool::{DispatchReport, WorkerId, WorkerPool};
pub use queue::{QueueStats, TaskQueue};
pub use registry::{HintSlot, PasswordRecord, PasswordRegistry, RecordId};
