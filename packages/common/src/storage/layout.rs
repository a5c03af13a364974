use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use crate::language::LanguageConfig;
use crate::models::Submission;

/// Filesystem placement of submitted sources.
///
/// Sources live at `{root}/{user_id}/{problem_id}/{submission_id}/{file_name}`.
/// Every path is derived from identifiers and language configuration only, so
/// computing it twice always yields the same result.
#[derive(Clone, Debug)]
pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the source of one submission.
    pub fn directory(&self, user_id: i32, problem_id: i32, submission_id: i32) -> PathBuf {
        self.root
            .join(user_id.to_string())
            .join(problem_id.to_string())
            .join(submission_id.to_string())
    }

    /// The language's fixed entry point if it has one, otherwise the
    /// submission id, followed by the language's extension.
    pub fn file_name(submission_id: i32, language: &LanguageConfig) -> String {
        let base = match &language.entry_point {
            Some(entry_point) => entry_point.clone(),
            None => submission_id.to_string(),
        };
        format!("{base}{}", language.extension)
    }

    pub fn source_path(&self, submission: &Submission, language: &LanguageConfig) -> PathBuf {
        self.directory(submission.user_id, submission.problem_id, submission.id)
            .join(Self::file_name(submission.id, language))
    }

    /// Reject uploads larger than `limit` bytes.
    pub fn check_size(len: u64, limit: u64) -> Result<(), StorageError> {
        if len > limit {
            return Err(StorageError::SourceTooLarge { actual: len, limit });
        }
        Ok(())
    }

    /// Write `content` to the submission's source path.
    ///
    /// The size limit is checked before touching the filesystem. Missing
    /// directories are created; existing ones (including ones created
    /// concurrently by another worker) are left as they are.
    pub async fn store(
        &self,
        submission: &Submission,
        language: &LanguageConfig,
        limit: u64,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        Self::check_size(content.len() as u64, limit)?;

        let directory = self.directory(submission.user_id, submission.problem_id, submission.id);
        fs::create_dir_all(&directory).await?;

        let path = directory.join(Self::file_name(submission.id, language));
        fs::write(&path, content).await?;

        debug!(
            submission_id = submission.id,
            path = %path.display(),
            bytes = content.len(),
            "Stored submission source"
        );
        Ok(path)
    }

    /// Delete the submission's directory and everything in it. A directory
    /// that was never created is not an error.
    pub async fn remove(&self, submission: &Submission) -> Result<(), StorageError> {
        let directory = self.directory(submission.user_id, submission.problem_id, submission.id);
        match fs::remove_dir_all(&directory).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored source back.
    pub async fn read_source(
        &self,
        submission: &Submission,
        language: &LanguageConfig,
    ) -> Result<Vec<u8>, StorageError> {
        let path = self.source_path(submission, language);
        match fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
