use std::sync::Arc;

use async_trait::async_trait;
use common::event::SubmissionEvent;
use common::{LanguageTable, Submission};
use mq::BrokerQueue;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{Result, WorkerError};
use crate::store::SubmissionStore;

/// Real-time delivery of submission snapshots.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: SubmissionEvent) -> Result<()>;
}

/// Build the event describing the current state of `submission`.
pub async fn snapshot(
    store: &dyn SubmissionStore,
    languages: &LanguageTable,
    submission: &Submission,
) -> Result<SubmissionEvent> {
    let user = store.user(submission.user_id).await?;
    let problem = store.problem(submission.problem_id).await?;
    let user_score = store
        .user_score(submission.user_id, problem.contest_id)
        .await?
        .map(|score| score.point());
    let language_name = languages
        .get(&submission.language)
        .map_or(submission.language.as_str(), |l| l.name.as_str());

    Ok(SubmissionEvent::snapshot(
        submission,
        &user,
        &problem,
        language_name,
        user_score,
    ))
}

/// In-process fan-out to any number of subscribers.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SubmissionEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, event: SubmissionEvent) -> Result<()> {
        let id = event.id;
        match self.sender.send(event) {
            Ok(receivers) => debug!(submission_id = id, receivers, "Broadcast submission event"),
            // Nobody listening is not a failure.
            Err(_) => debug!(submission_id = id, "No subscribers for submission event"),
        }
        Ok(())
    }
}

/// Publishes events to the broker's event queue.
pub struct QueueNotifier {
    queue: Arc<BrokerQueue>,
    event_queue_name: String,
}

impl QueueNotifier {
    pub fn new(queue: Arc<BrokerQueue>, event_queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            event_queue_name: event_queue_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for QueueNotifier {
    async fn notify(&self, event: SubmissionEvent) -> Result<()> {
        self.queue
            .publish(&self.event_queue_name, &event)
            .await
            .map_err(|e| WorkerError::Notify(e.to_string()))
    }
}

/// Delivers each event to every inner notifier, in order.
#[derive(Default)]
pub struct Notifiers(Vec<Arc<dyn Notifier>>);

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.0.push(notifier);
        self
    }
}

#[async_trait]
impl Notifier for Notifiers {
    async fn notify(&self, event: SubmissionEvent) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.0 {
            if let Err(e) = notifier.notify(event.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
