//! Invocation of the external sandboxed-execution harness.
//!
//! The harness is run once per test case as
//! `<bin> <source path> <runtime> <input path>` and answers on stdout with
//! `<payload>[TIME:<ms>ms][MEMORY:<kb>KB]`, or with one of the sentinels
//! `[ERROR][RUNTIME]` / `[ERROR][COMPILE]`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

pub const RUNTIME_SENTINEL: &str = "[ERROR][RUNTIME]";
pub const COMPILE_SENTINEL: &str = "[ERROR][COMPILE]";
const METRICS_MARKER: &str = "[TIME:";

static METRICS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[TIME:(\d+)ms\]\[MEMORY:(\d+)KB\]$").expect("metrics pattern is valid")
});

/// One harness call: run `source_path` with `runtime` on `input_path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessRequest {
    pub source_path: PathBuf,
    pub runtime: String,
    pub input_path: PathBuf,
}

/// Parsed harness answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarnessReport {
    Output {
        payload: String,
        time_ms: u64,
        memory_kb: u64,
    },
    RuntimeFault,
    CompileFault,
    /// Neither a sentinel nor a well-formed output line.
    Unrecognized(String),
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("harness exceeded its time budget of {0:?}")]
    Timeout(Duration),

    #[error("failed to spawn harness '{bin}': {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("harness IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Harness: Send + Sync {
    /// Run one test case. Exceeding `budget` yields [`HarnessError::Timeout`].
    async fn invoke(
        &self,
        request: &HarnessRequest,
        budget: Duration,
    ) -> Result<HarnessReport, HarnessError>;
}

/// Harness run as a child process.
#[derive(Clone, Debug)]
pub struct ProcessHarness {
    bin: PathBuf,
}

impl ProcessHarness {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl Harness for ProcessHarness {
    async fn invoke(
        &self,
        request: &HarnessRequest,
        budget: Duration,
    ) -> Result<HarnessReport, HarnessError> {
        let child = Command::new(&self.bin)
            .arg(&request.source_path)
            .arg(&request.runtime)
            .arg(&request.input_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            })?;
        let group = child.id().map(|pid| Pid::from_raw(pid as i32));

        // Dropping the pending wait on timeout kills the harness itself; the
        // program it started lives on in the same process group.
        let waited = tokio::time::timeout(budget, child.wait_with_output()).await;
        if let Some(group) = group {
            kill_group(group);
        }
        let output = waited.map_err(|_| HarnessError::Timeout(budget))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            exit_code = ?output.status.code(),
            bytes = output.stdout.len(),
            "Harness finished"
        );
        Ok(parse_report(chomp(&stdout)))
    }
}

/// SIGKILL every process left in the harness's process group.
fn kill_group(group: Pid) {
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = %group, error = %e, "Failed to kill harness process group"),
    }
}

/// Strip one trailing line terminator.
pub fn chomp(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .or_else(|| s.strip_suffix('\r'))
        .unwrap_or(s)
}

/// Parse the harness output line. The payload is everything before the
/// first `[TIME:` marker.
pub fn parse_report(line: &str) -> HarnessReport {
    match line {
        RUNTIME_SENTINEL => return HarnessReport::RuntimeFault,
        COMPILE_SENTINEL => return HarnessReport::CompileFault,
        _ => {}
    }

    let Some(marker) = line.find(METRICS_MARKER) else {
        return HarnessReport::Unrecognized(line.to_string());
    };
    let (payload, metrics) = line.split_at(marker);

    let parsed = METRICS.captures(metrics).and_then(|caps| {
        let time_ms = caps[1].parse::<u64>().ok()?;
        let memory_kb = caps[2].parse::<u64>().ok()?;
        Some((time_ms, memory_kb))
    });

    match parsed {
        Some((time_ms, memory_kb)) => HarnessReport::Output {
            payload: payload.to_string(),
            time_ms,
            memory_kb,
        },
        None => HarnessReport::Unrecognized(line.to_string()),
    }
}
