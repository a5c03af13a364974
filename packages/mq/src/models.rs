use std::sync::Arc;

use async_trait::async_trait;
pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::{BroccoliQueue, ConsumeOptions},
};
use common::judge_job::JudgeJob;
use common::mq::Message;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::MqConfig;
use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}

/// Producer side of the work queue: one entry per admitted submission.
#[async_trait]
pub trait JudgeQueue: Send + Sync {
    async fn enqueue(&self, job: JudgeJob) -> Result<(), MqError>;
}

/// Work queue backed by the Redis broker.
pub struct BrokerQueue {
    mq: Arc<MqQueue>,
    queue_name: String,
}

impl BrokerQueue {
    pub fn new(mq: Arc<MqQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }

    /// Publish any message to a named queue on the same broker.
    pub async fn publish<M: Message>(&self, queue: &str, message: &M) -> Result<(), MqError> {
        self.mq
            .publish(queue, None, message, None)
            .await
            .map_err(|e| MqError::Publish {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        debug!(
            queue,
            message_type = M::message_type(),
            message_id = message.message_id(),
            "Published message"
        );
        Ok(())
    }

    pub fn broker(&self) -> &Arc<MqQueue> {
        &self.mq
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl JudgeQueue for BrokerQueue {
    async fn enqueue(&self, job: JudgeJob) -> Result<(), MqError> {
        self.publish(&self.queue_name, &job).await
    }
}

/// In-process work queue. Jobs are received by the worker pool through the
/// receiver returned by [`channel`].
#[derive(Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<JudgeJob>,
}

pub fn channel() -> (ChannelQueue, mpsc::UnboundedReceiver<JudgeJob>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelQueue { sender }, receiver)
}

#[async_trait]
impl JudgeQueue for ChannelQueue {
    async fn enqueue(&self, job: JudgeJob) -> Result<(), MqError> {
        let submission_id = job.submission_id;
        self.sender
            .send(job)
            .map_err(|_| MqError::Closed(format!("dropped job for submission {submission_id}")))?;
        debug!(submission_id, "Enqueued judge job");
        Ok(())
    }
}
