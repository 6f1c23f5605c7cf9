//! Worker threads and the cracking they run

pub mod cracker;
pub mod runner;

pub use cracker::{sha256_hex, Cracker, Sha256Cracker};
pub use runner::{aggregate_stats, Worker, WorkerStats};
