pub mod admission;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod store;

#[cfg(test)]
mod testing;

pub use admission::{Admission, AdmissionError, SubmissionRequest};
pub use catalog::Catalog;
pub use config::{JudgeConfig, WorkerAppConfig, WorkerConfig};
pub use error::{Result, WorkerError};
pub use models::{Judge, Judgement, Lifecycle, ProcessHarness, Scoring, WorkerPool};
pub use notify::{BroadcastNotifier, Notifier, Notifiers, QueueNotifier};
pub use store::{MemoryStore, StoreError, SubmissionStore};
