use std::path::PathBuf;

use common::LanguageTable;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Number of submissions judged concurrently. Default: 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_concurrency() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            concurrency: default_concurrency(),
        }
    }
}

/// Judging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Root directory of stored sources. Default: "data/submissions".
    #[serde(default = "default_submissions_dir")]
    pub submissions_dir: PathBuf,
    /// Harness executable. Default: "bin/run_code.sh".
    #[serde(default = "default_harness_bin")]
    pub harness_bin: PathBuf,
    /// Points deducted per slow-submission decay step. Default: 1.
    #[serde(default = "default_decay_point_per_step")]
    pub decay_point_per_step: i64,
}

fn default_submissions_dir() -> PathBuf {
    "data/submissions".into()
}
fn default_harness_bin() -> PathBuf {
    "bin/run_code.sh".into()
}
fn default_decay_point_per_step() -> i64 {
    1
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            submissions_dir: default_submissions_dir(),
            harness_bin: default_harness_bin(),
            decay_point_per_step: default_decay_point_per_step(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    /// Language tag -> runtime, extension and entry point.
    #[serde(default)]
    pub languages: LanguageTable,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("ARBITER_CONFIG").unwrap_or_else(|_| "config/config".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.concurrency", 4_i64)?
            .set_default("mq.enabled", false)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.queue_name", "judge_jobs")?
            .set_default("mq.event_queue_name", "submission_events")?
            .set_default("judge.submissions_dir", "data/submissions")?
            .set_default("judge.harness_bin", "bin/run_code.sh")?
            .set_default("judge.decay_point_per_step", 1_i64)?
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("ARBITER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
