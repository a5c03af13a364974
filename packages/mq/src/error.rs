use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Failed to publish to '{queue}': {message}")]
    Publish { queue: String, message: String },

    #[error("Queue closed: {0}")]
    Closed(String),

    #[error("{0}")]
    Internal(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Internal(e.to_string())
    }
}
