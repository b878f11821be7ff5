//! JSON reporter
//!
//! Outputs the verdict, the run summary and every problem as pretty-printed
//! JSON. Each problem carries its severity and whether it was fatal under the
//! run's policy.

use crate::models::{ErrorKind, Problem, Severity, Summary};
use crate::problems::Verdict;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    strict: bool,
    summary: &'a Summary,
    problems: Vec<JsonProblem<'a>>,
    failure: Option<&'a Problem>,
}

#[derive(Serialize)]
struct JsonProblem<'a> {
    kind: ErrorKind,
    severity: Severity,
    fatal: bool,
    description: &'a str,
    detail: Option<&'a str>,
}

/// Render report as JSON
pub fn render(summary: &Summary, verdict: &Verdict) -> Result<String> {
    let problems = verdict
        .problems
        .iter()
        .map(|p| JsonProblem {
            kind: p.kind,
            severity: p.severity(),
            fatal: verdict.is_fatal(p),
            description: &p.description,
            detail: p.detail.as_deref(),
        })
        .collect();
    let report = JsonReport {
        passed: verdict.passed(),
        strict: verdict.strict,
        summary,
        problems,
        failure: verdict.failure.as_ref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
