//! Creation workflow: validate, store the source, enqueue, announce.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::judge_job::JudgeJob;
use common::storage::{SourceLayout, StorageError};
use common::{LanguageConfig, LanguageTable, Submission};
use mq::JudgeQueue;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::notify::{Notifier, snapshot};
use crate::store::{StoreError, SubmissionStore};

/// A submission attempt as received from a client.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubmissionRequest {
    pub user_id: Option<i32>,
    pub problem_id: Option<i32>,
    pub language: Option<String>,
    #[serde(default)]
    pub source: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Source file is required")]
    MissingSource,

    #[error("Problem {0} does not exist")]
    UnknownProblem(i32),

    #[error("Contest ended")]
    ContestClosed,

    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AdmissionError {
    fn from(e: StoreError) -> Self {
        AdmissionError::Internal(e.to_string())
    }
}

impl From<mq::MqError> for AdmissionError {
    fn from(e: mq::MqError) -> Self {
        AdmissionError::Internal(e.to_string())
    }
}

pub struct Admission {
    store: Arc<dyn SubmissionStore>,
    layout: SourceLayout,
    languages: Arc<LanguageTable>,
    queue: Arc<dyn JudgeQueue>,
    notifier: Arc<dyn Notifier>,
}

impl Admission {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        layout: SourceLayout,
        languages: Arc<LanguageTable>,
        queue: Arc<dyn JudgeQueue>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            layout,
            languages,
            queue,
            notifier,
        }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<Submission, AdmissionError> {
        self.submit_at(request, Utc::now()).await
    }

    /// Admit `request` as made at `created_at`.
    ///
    /// Every check runs before anything is written, so a rejected attempt
    /// leaves no record, no file and no queue entry behind.
    #[instrument(skip_all, fields(user_id = ?request.user_id, problem_id = ?request.problem_id))]
    pub async fn submit_at(
        &self,
        request: SubmissionRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Submission, AdmissionError> {
        let user_id = request.user_id.ok_or(AdmissionError::MissingField("user_id"))?;
        let problem_id = request
            .problem_id
            .ok_or(AdmissionError::MissingField("problem_id"))?;
        let tag = request
            .language
            .filter(|l| !l.is_empty())
            .ok_or(AdmissionError::MissingField("language"))?;
        let source = request.source.ok_or(AdmissionError::MissingSource)?;

        let problem = match self.store.problem(problem_id).await {
            Ok(problem) => problem,
            Err(StoreError::NotFound { .. }) => return Err(AdmissionError::UnknownProblem(problem_id)),
            Err(e) => return Err(e.into()),
        };
        let contest = self.store.contest(problem.contest_id).await?;
        if !contest.submittable {
            return Err(AdmissionError::ContestClosed);
        }
        let language = self
            .languages
            .get(&tag)
            .ok_or_else(|| AdmissionError::UnsupportedLanguage(tag.clone()))?;
        SourceLayout::check_size(source.len() as u64, problem.source_size_limit)?;

        let submission = self
            .store
            .create_submission(user_id, problem_id, &tag, created_at)
            .await?;
        if let Err(e) = self
            .persist(&submission, language, problem.source_size_limit, &source)
            .await
        {
            self.discard(&submission).await;
            return Err(e);
        }
        info!(submission_id = submission.id, language = %tag, "Submission queued");

        if let Err(e) = self.announce(&submission).await {
            warn!(submission_id = submission.id, error = %e, "Failed to announce submission");
        }

        Ok(submission)
    }

    async fn persist(
        &self,
        submission: &Submission,
        language: &LanguageConfig,
        limit: u64,
        source: &[u8],
    ) -> Result<(), AdmissionError> {
        self.layout.store(submission, language, limit, source).await?;
        self.queue.enqueue(JudgeJob::new(submission.id)).await?;
        Ok(())
    }

    /// Undo a partially admitted submission: its record and its directory.
    async fn discard(&self, submission: &Submission) {
        if let Err(e) = self.store.delete_submission(submission.id).await {
            error!(submission_id = submission.id, error = %e, "Failed to delete submission record");
        }
        if let Err(e) = self.layout.remove(submission).await {
            error!(submission_id = submission.id, error = %e, "Failed to remove submission directory");
        }
    }

    async fn announce(&self, submission: &Submission) -> crate::error::Result<()> {
        let event = snapshot(self.store.as_ref(), &self.languages, submission).await?;
        self.notifier.notify(event).await
    }
}
