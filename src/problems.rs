//! Problem accumulation and the final verdict
//!
//! Analysis phases never stop on a finding: they push it into a
//! [`ProblemSink`] passed down by `&mut` and carry on. Only [`ProblemSink::finalize`]
//! decides, from each problem's severity and the strict switch, whether the
//! run passed.

use crate::models::{ErrorKind, Problem, Severity};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

/// Order-insensitive set of problems, deduplicated by description
#[derive(Debug, Default)]
pub struct ProblemSink {
    problems: FxHashMap<String, Problem>,
}

impl ProblemSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem. Returns `false` if one with the same description was
    /// already present, in which case the first one is kept.
    pub fn add(&mut self, problem: Problem) -> bool {
        if self.problems.contains_key(&problem.description) {
            debug!("Duplicate problem ignored: {}", problem.canonical());
            return false;
        }
        self.problems.insert(problem.description.clone(), problem);
        true
    }

    pub fn extend(&mut self, problems: impl IntoIterator<Item = Problem>) {
        for problem in problems {
            self.add(problem);
        }
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn contains(&self, description: &str) -> bool {
        self.problems.contains_key(description)
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.problems.values().filter(|p| p.kind == kind).count()
    }

    /// All problems in canonical order
    pub fn sorted(&self) -> Vec<Problem> {
        let mut problems: Vec<Problem> = self.problems.values().cloned().collect();
        problems.sort_by_key(|p| p.canonical());
        problems
    }

    /// Decide the run outcome.
    ///
    /// Zero fatal problems pass. Exactly one fatal problem becomes the failure
    /// as-is; more than one are wrapped in a single `MultipleErrors` problem.
    pub fn finalize(&self, strict: bool) -> Verdict {
        let problems = self.sorted();
        let fatal: Vec<&Problem> = problems.iter().filter(|p| p.is_fatal(strict)).collect();
        debug!(
            "Finalizing {} problem(s), {} fatal (strict: {})",
            problems.len(),
            fatal.len(),
            strict
        );

        let failure = match fatal.as_slice() {
            [] => None,
            [only] => Some((*only).clone()),
            many => {
                let detail = many
                    .iter()
                    .map(|p| p.rendered())
                    .collect::<Vec<_>>()
                    .join("\n");
                Some(
                    Problem::new(
                        ErrorKind::MultipleErrors,
                        format!("{} errors", many.len()),
                    )
                    .with_detail(detail),
                )
            }
        };

        Verdict {
            strict,
            problems,
            failure,
        }
    }
}

/// Outcome of a run: every problem found plus the failure, if any
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub strict: bool,
    /// Every problem, fatal or not, in canonical order
    pub problems: Vec<Problem>,
    pub failure: Option<Problem>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn is_fatal(&self, problem: &Problem) -> bool {
        problem.is_fatal(self.strict)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| self.is_fatal(p))
    }

    pub fn non_fatal(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| !self.is_fatal(p))
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.problems
            .iter()
            .filter(|p| p.severity() == severity)
            .count()
    }

    /// The verdict as a `Result`, failing with the single or wrapped problem
    pub fn into_result(self) -> Result<Vec<Problem>, Problem> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.problems),
        }
    }
}
