//! Submission Lifecycle: `Queued -> Running -> Finished`.
//!
//! `run` enters Running and judges; `finish` records the verdict together with
//! the state change and notifies subscribers. Both transitions are checked by
//! the store atomically, so a duplicate delivery of the same job cannot start
//! a second execution.

use std::sync::Arc;

use common::{LanguageTable, LifecycleEvent, Submission, Verdict};
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::models::judge::{Judge, Judgement};
use crate::notify::{Notifier, snapshot};
use crate::store::SubmissionStore;

pub struct Lifecycle {
    store: Arc<dyn SubmissionStore>,
    judge: Arc<Judge>,
    notifier: Arc<dyn Notifier>,
    languages: Arc<LanguageTable>,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        judge: Arc<Judge>,
        notifier: Arc<dyn Notifier>,
        languages: Arc<LanguageTable>,
    ) -> Self {
        Self {
            store,
            judge,
            notifier,
            languages,
        }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Fire `run` and drive the submission to Finished.
    ///
    /// Fails with [`WorkerError::Transition`](crate::WorkerError::Transition)
    /// if the submission is not Queued.
    #[instrument(skip(self))]
    pub async fn run(&self, submission_id: i32) -> Result<Submission> {
        let submission = self
            .store
            .transition(submission_id, LifecycleEvent::Run)
            .await?;
        info!("Submission running");

        let judgement = match self.judge.execute(&submission).await {
            Ok(judgement) => judgement,
            // The problem could not be loaded, so no test case ran.
            Err(e) => {
                error!(error = %e, "Judging failed");
                Judgement::new(Verdict::JudgeError)
            }
        };

        self.finish(submission_id, &judgement).await
    }

    async fn finish(&self, submission_id: i32, judgement: &Judgement) -> Result<Submission> {
        let submission = self.store.finish(submission_id, judgement).await?;
        info!(verdict = %judgement.verdict, "Submission finished");

        // The verdict is already recorded; a lost notification does not undo it.
        if let Err(e) = self.notify(&submission).await {
            warn!(error = %e, "Failed to notify submission result");
        }
        Ok(submission)
    }

    async fn notify(&self, submission: &Submission) -> Result<()> {
        let event = snapshot(self.store.as_ref(), &self.languages, submission).await?;
        self.notifier.notify(event).await
    }
}
