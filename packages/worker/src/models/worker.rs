use std::sync::Arc;

use common::judge_job::JudgeJob;
use mq::{BroccoliError, BrokerMessage, MqError, MqQueue};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::Result;
use crate::handlers::judge::handle_judge_job;
use crate::models::lifecycle::Lifecycle;

/// Pool of workers pulling judge jobs, at most `concurrency` in flight.
pub struct WorkerPool {
    lifecycle: Arc<Lifecycle>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(lifecycle: Arc<Lifecycle>, concurrency: usize) -> Self {
        Self {
            lifecycle,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Consume the in-process queue until every sender is dropped and all
    /// started jobs have finished.
    pub async fn run(&self, mut receiver: mpsc::UnboundedReceiver<JudgeJob>) {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        while let Some(job) = receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let lifecycle = Arc::clone(&self.lifecycle);
            tasks.spawn(async move {
                let _permit = permit;
                let submission_id = job.submission_id;
                if let Err(e) = handle_judge_job(&lifecycle, job).await {
                    error!(submission_id, error = %e, "Failed to handle judge job");
                }
            });

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        info!("Judge queue closed, worker pool stopped");
    }

    /// Consume judge jobs from the broker queue. Runs until the broker fails.
    pub async fn run_broker(&self, mq: &MqQueue, queue_name: &str) -> Result<()> {
        info!(queue = queue_name, concurrency = self.concurrency, "Starting judge job consumer");

        let lifecycle = Arc::clone(&self.lifecycle);
        mq.process_messages(
            queue_name,
            Some(self.concurrency),
            None,
            move |message: BrokerMessage<JudgeJob>| {
                let lifecycle = Arc::clone(&lifecycle);
                async move {
                    let job = message.payload;
                    let submission_id = job.submission_id;
                    if let Err(e) = handle_judge_job(&lifecycle, job).await {
                        error!(submission_id, error = %e, "Failed to handle judge job");
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await
        .map_err(MqError::from)?;

        Ok(())
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Judge task panicked");
    }
}
