//! Users, contests and problems for local judging, read from a TOML file.
//!
//! ```toml
//! [[users]]
//! id = 1
//! email = "alice@example.com"
//!
//! [[contests]]
//! id = 1
//! name = "Practice"
//! start_at = "2024-01-01T10:00:00Z"
//! submittable = true
//! point_visible = true
//! result_announced = false
//!
//! [[problems]]
//! id = 1
//! contest_id = 1
//! name = "A + B"
//! time_limit = 1000
//! memory_limit = 65536
//! source_size_limit = 65536
//! point = 100
//! wrong_answer_penalty = 10
//! decay_interval = 600
//! test_cases = [{ input = "problems/1/1.in", output = "problems/1/1.out" }]
//! ```
//!
//! Relative test case paths are resolved against the catalog's directory.

use std::collections::HashSet;
use std::path::Path;

use common::{Contest, Problem, User};
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, WorkerError};
use crate::store::MemoryStore;

#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub contests: Vec<Contest>,
    #[serde(default)]
    pub problems: Vec<Problem>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorkerError::Catalog(format!("{}: {e}", path.display())))?;
        let mut catalog = Self::parse(&text)?;
        if let Some(base) = path.parent() {
            catalog.resolve_paths(base);
        }
        Ok(catalog)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let catalog: Catalog =
            toml::from_str(text).map_err(|e| WorkerError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for test_case in self.problems.iter_mut().flat_map(|p| p.test_cases.iter_mut()) {
            if test_case.input.is_relative() {
                test_case.input = base.join(&test_case.input);
            }
            if test_case.output.is_relative() {
                test_case.output = base.join(&test_case.output);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let contests: HashSet<i32> = self.contests.iter().map(|c| c.id).collect();
        for problem in &self.problems {
            if !contests.contains(&problem.contest_id) {
                return Err(WorkerError::Catalog(format!(
                    "problem {} references unknown contest {}",
                    problem.id, problem.contest_id
                )));
            }
        }
        Ok(())
    }

    /// Load every record into `store`.
    pub async fn seed(self, store: &MemoryStore) {
        info!(
            users = self.users.len(),
            contests = self.contests.len(),
            problems = self.problems.len(),
            "Seeding store from catalog"
        );
        for user in self.users {
            store.insert_user(user).await;
        }
        for contest in self.contests {
            store.insert_contest(contest).await;
        }
        for problem in self.problems {
            store.insert_problem(problem).await;
        }
    }
}
