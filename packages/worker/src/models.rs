pub mod harness;
pub mod judge;
pub mod lifecycle;
pub mod scoring;
pub mod worker;

pub use harness::{Harness, HarnessError, HarnessReport, HarnessRequest, ProcessHarness};
pub use judge::{Judge, Judgement};
pub use lifecycle::Lifecycle;
pub use scoring::Scoring;
pub use worker::WorkerPool;
