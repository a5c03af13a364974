use common::TransitionError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("MQ error: {0}")]
    Mq(#[from] mq::MqError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("Notification error: {0}")]
    Notify(String),
}

impl From<StoreError> for WorkerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Transition(e) => WorkerError::Transition(e),
            other => WorkerError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
