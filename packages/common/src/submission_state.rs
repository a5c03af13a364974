#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state of a submission.
///
/// A submission moves `Queued -> Running -> Finished`, each step exactly once.
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Waiting to be picked up by a worker.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "queued"))]
    Queued,
    /// Test cases are being executed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "running"))]
    Running,
    /// A verdict has been recorded. Terminal.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "finished"))]
    Finished,
}

/// Events that move a submission through its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Run,
    Finish,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => f.write_str("run"),
            Self::Finish => f.write_str("finish"),
        }
    }
}

/// A lifecycle event was fired from a state that does not accept it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("cannot {event} a submission that is {from}")]
pub struct TransitionError {
    pub from: SubmissionState,
    pub event: LifecycleEvent,
}

impl SubmissionState {
    /// Returns the state reached by firing `event`, or an error if the
    /// transition does not exist.
    pub fn apply(self, event: LifecycleEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Queued, LifecycleEvent::Run) => Ok(Self::Running),
            (Self::Running, LifecycleEvent::Finish) => Ok(Self::Finished),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid state or verdict string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{invalid}'")]
pub struct ParseStateError {
    invalid: String,
}

impl FromStr for SubmissionState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            _ => Err(ParseStateError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Final grading outcome of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Verdict {
    /// Every test case produced the expected output.
    #[serde(rename = "Accepted")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Wrong Answer"))]
    WrongAnswer,
    #[serde(rename = "Runtime Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Runtime Error"))]
    RuntimeError,
    #[serde(rename = "Compile Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Compile Error"))]
    CompileError,
    #[serde(rename = "Limited memory exceeded")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Limited memory exceeded"))]
    MemoryLimitExceeded,
    #[serde(rename = "Limited time exceeded")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Limited time exceeded"))]
    TimeLimitExceeded,
    /// The harness answered with something the judge cannot interpret, or
    /// the harness itself could not be run.
    #[serde(rename = "Judge Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Judge Error"))]
    JudgeError,
}

impl Verdict {
    pub const ALL: &'static [Verdict] = &[
        Self::Accepted,
        Self::WrongAnswer,
        Self::RuntimeError,
        Self::CompileError,
        Self::MemoryLimitExceeded,
        Self::TimeLimitExceeded,
        Self::JudgeError,
    ];

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::RuntimeError => "Runtime Error",
            Self::CompileError => "Compile Error",
            Self::MemoryLimitExceeded => "Limited memory exceeded",
            Self::TimeLimitExceeded => "Limited time exceeded",
            Self::JudgeError => "Judge Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseStateError {
                invalid: s.to_string(),
            })
    }
}

/// Presentation class of a submission row, derived from state and verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayClass {
    Info,
    Success,
    Error,
}

impl DisplayClass {
    pub fn of(state: SubmissionState, verdict: Option<Verdict>) -> Self {
        match (state, verdict) {
            (SubmissionState::Queued, _) => Self::Info,
            (SubmissionState::Finished, Some(Verdict::Accepted)) => Self::Success,
            _ => Self::Error,
        }
    }
}
