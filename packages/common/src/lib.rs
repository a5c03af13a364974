pub mod config;
pub mod event;
pub mod judge_job;
pub mod language;
pub mod models;
pub mod mq;
pub mod storage;
pub mod submission_state;

pub use language::{LanguageConfig, LanguageTable};
pub use models::{Contest, Problem, Submission, TestCase, User, UserScore};
pub use submission_state::{
    DisplayClass, LifecycleEvent, SubmissionState, TransitionError, Verdict,
};
