//! hintcrack - Hint-Guided Password Cracking
//!
//! A coordinator drives a pool of worker threads that brute-force a file of
//! password records. Every password comes with hints: each hint is the hash
//! of a permutation of the password alphabet with one character removed.
//! Cracking the hints first narrows the password down to the characters no
//! hint is missing, which makes the password search small.
//!
//! # Features
//!
//! - **Pull-Based Ingestion**: The coordinator asks for the next batch of
//!   records only when both task queues have run dry.
//!
//! - **Password-First Dispatch**: Password tasks unlocked by fully decrypted
//!   hints are handed out before any remaining hint work.
//!
//! - **Liveness Tracking**: Workers that exit or panic are dropped from the
//!   pool; the run continues with the rest.
//!
//! - **Idempotent Shutdown**: End of input drains in-flight work, dumps the
//!   final registry and stops every thread exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Batch   ┌──────────────────────────┐  Report  ┌─────────────┐
//! │ BatchReader  ├─────────►│       Coordinator        ├─────────►│  Collector  │
//! │ (own thread) │◄─────────┤  - PasswordRegistry      │          │ (own thread)│
//! └──────────────┘ReadBatch │  - TaskQueue (2 FIFOs)   │          └─────────────┘
//!                           │  - WorkerPool            │
//!                           │  - LivenessMonitor       │
//!                           └───────┬─────────▲────────┘
//!                        tasks      │         │   replies, liveness
//!                  ┌────────────────┼─────────┼────────────────┐
//!            ┌─────▼─────┐    ┌─────▼─────┐   │          ┌─────┴─────┐
//!            │ Worker 1  │    │ Worker 2  │  ...         │ Worker N  │
//!            │  SHA-256  │    │  SHA-256  │              │  SHA-256  │
//!            └───────────┘    └───────────┘              └───────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Crack with one worker per core, reports on stdout
//! hintcrack passwords.csv
//!
//! # Sixteen workers, reports to a file, JSON summary
//! hintcrack passwords.csv -w 16 -o results.txt --format json
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod master;
pub mod messages;
pub mod progress;
pub mod reader;
pub mod system;
pub mod worker;

pub use config::{CliArgs, CrackConfig, SummaryFormat};
pub use error::{CrackError, Result};
pub use master::{Coordinator, CoordinatorReport, RunState};
pub use system::{CrackSystem, RunSummary, ShutdownHandle};
pub use worker::{Cracker, Sha256Cracker};
