//! Judge Executor.
//!
//! Runs a submission against its problem's test cases in order, stopping at
//! the first failing one, and persists progress after every passed case.

use std::sync::Arc;

use common::storage::SourceLayout;
use common::{LanguageTable, Problem, Submission, Verdict};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::models::harness::{Harness, HarnessError, HarnessReport, HarnessRequest, chomp};
use crate::models::scoring::Scoring;
use crate::store::SubmissionStore;

/// Outcome of one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Judgement {
    pub verdict: Verdict,
    pub last_passed_test_case: usize,
    pub used_time: u64,
    pub used_memory: u64,
    pub received_point: Option<i64>,
}

impl Judgement {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            last_passed_test_case: 0,
            used_time: 0,
            used_memory: 0,
            received_point: None,
        }
    }
}

pub struct Judge {
    store: Arc<dyn SubmissionStore>,
    harness: Arc<dyn Harness>,
    layout: SourceLayout,
    languages: Arc<LanguageTable>,
    scoring: Scoring,
}

impl Judge {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        harness: Arc<dyn Harness>,
        layout: SourceLayout,
        languages: Arc<LanguageTable>,
        scoring: Scoring,
    ) -> Self {
        Self {
            store,
            harness,
            layout,
            languages,
            scoring,
        }
    }

    /// Decide the verdict of `submission`, crediting points on a first
    /// acceptance.
    ///
    /// Execution faults are returned as the judgement's verdict. An `Err`
    /// means the problem could not be loaded and nothing was run.
    ///
    /// Once test cases have run, store failures no longer discard what was
    /// measured: a failure while recording progress ends judging with
    /// `JudgeError` and the maxima seen so far, and a failure while crediting
    /// points leaves an Accepted verdict without a received point.
    #[instrument(skip_all, fields(submission_id = submission.id))]
    pub async fn execute(&self, submission: &Submission) -> Result<Judgement> {
        let problem = self.store.problem(submission.problem_id).await?;

        let mut judgement = Judgement::new(Verdict::Accepted);
        judgement.verdict = match self
            .run_test_cases(submission, &problem, &mut judgement)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, "Failed to record judging progress");
                Verdict::JudgeError
            }
        };

        if judgement.verdict.is_accepted() {
            match self.credit(submission).await {
                Ok(point) => judgement.received_point = point,
                Err(e) => error!(error = %e, "Failed to credit points"),
            }
        }

        info!(
            verdict = %judgement.verdict,
            last_passed_test_case = judgement.last_passed_test_case,
            used_time = judgement.used_time,
            used_memory = judgement.used_memory,
            "Judging completed"
        );
        Ok(judgement)
    }

    /// Award points unless the user already solved the problem.
    async fn credit(&self, submission: &Submission) -> Result<Option<i64>> {
        if self
            .store
            .has_accepted(submission.user_id, submission.problem_id, submission.id)
            .await?
        {
            return Ok(None);
        }
        self.scoring.award(submission).await
    }

    async fn run_test_cases(
        &self,
        submission: &Submission,
        problem: &Problem,
        progress: &mut Judgement,
    ) -> Result<Verdict> {
        let Some(language) = self.languages.get(&submission.language) else {
            warn!(language = %submission.language, "Language is not configured");
            return Ok(Verdict::JudgeError);
        };
        let source_path = self.layout.source_path(submission, language);
        let budget = problem.time_budget();

        for (index, test_case) in problem.test_cases.iter().enumerate() {
            let number = index + 1;
            let request = HarnessRequest {
                source_path: source_path.clone(),
                runtime: language.runtime.clone(),
                input_path: test_case.input.clone(),
            };

            let report = match self.harness.invoke(&request, budget).await {
                Ok(report) => report,
                Err(HarnessError::Timeout(_)) => {
                    info!(test_case = number, "Time budget exceeded");
                    return Ok(Verdict::TimeLimitExceeded);
                }
                Err(e) => {
                    error!(test_case = number, error = %e, "Harness invocation failed");
                    return Ok(Verdict::JudgeError);
                }
            };

            let (payload, time_ms, memory_kb) = match report {
                HarnessReport::Output {
                    payload,
                    time_ms,
                    memory_kb,
                } => (payload, time_ms, memory_kb),
                HarnessReport::RuntimeFault => return Ok(Verdict::RuntimeError),
                HarnessReport::CompileFault => return Ok(Verdict::CompileError),
                HarnessReport::Unrecognized(line) => {
                    warn!(test_case = number, output = %line, "Unrecognized harness output");
                    return Ok(Verdict::JudgeError);
                }
            };

            progress.used_time = progress.used_time.max(time_ms);
            progress.used_memory = progress.used_memory.max(memory_kb);
            if progress.used_memory > problem.memory_limit {
                return Ok(Verdict::MemoryLimitExceeded);
            }

            let expected = match fs::read(&test_case.output).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    error!(
                        test_case = number,
                        path = %test_case.output.display(),
                        error = %e,
                        "Failed to read expected output"
                    );
                    return Ok(Verdict::JudgeError);
                }
            };

            if normalize(&payload) != normalize(&expected) {
                self.store
                    .record_failed_output(submission.id, &payload)
                    .await?;
                return Ok(Verdict::WrongAnswer);
            }

            self.store.record_progress(submission.id, number).await?;
            progress.last_passed_test_case = number;
            debug!(test_case = number, time_ms, memory_kb, "Test case passed");
        }

        Ok(Verdict::Accepted)
    }
}

/// Strip one trailing newline and convert CRLF to LF.
fn normalize(output: &str) -> String {
    chomp(output).replace("\r\n", "\n")
}
