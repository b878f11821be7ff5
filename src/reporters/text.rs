//! Text (terminal) reporter with colors and formatting

use crate::models::{Problem, Severity, Summary};
use crate::problems::Verdict;
use anyhow::Result;
use console::style;
use std::fmt::Write;

/// Severity tag under the run's policy
fn tag(verdict: &Verdict, problem: &Problem) -> String {
    if verdict.is_fatal(problem) {
        style("FATAL").red().bold().to_string()
    } else {
        style("WARN ").yellow().to_string()
    }
}

/// Render summary, problems and verdict as terminal output
pub fn render(summary: &Summary, verdict: &Verdict) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "\n{}", style("Architecture Conformance").bold())?;
    writeln!(
        out,
        "{}",
        style("──────────────────────────────────────").dim()
    )?;
    writeln!(
        out,
        "Layers: {}  Domains: {}  Components: {}  Types: {}  Unresolved names: {}",
        summary.layers,
        summary.domains,
        summary.components,
        summary.types,
        summary.unresolved_names
    )?;
    writeln!(
        out,
        "References: {} (intra-component {}, legal {}, illegal same-layer {}, illegal lower-to-higher {})\n",
        summary.references,
        summary.intra_component,
        summary.legal,
        summary.illegal_same_layer,
        summary.illegal_lower_to_higher
    )?;

    if verdict.problems.is_empty() {
        writeln!(out, "{}\n", style("No problems found").green())?;
    } else {
        writeln!(
            out,
            "{} ({} total, {} fatal, {} warning(s))",
            style("PROBLEMS").bold(),
            verdict.problems.len(),
            verdict.fatal().count(),
            verdict.count_by_severity(Severity::Warning)
        )?;
        for problem in &verdict.problems {
            writeln!(out, "  {} {}", tag(verdict, problem), problem.canonical())?;
            if let Some(detail) = &problem.detail {
                for line in detail.lines() {
                    writeln!(out, "        {}", style(line).dim())?;
                }
            }
        }
        writeln!(out)?;
    }

    let mode = if verdict.strict { "strict" } else { "lenient" };
    if verdict.passed() {
        writeln!(out, "Result: {} ({mode})", style("PASSED").green().bold())?;
    } else {
        writeln!(
            out,
            "Result: {} ({mode}, {} fatal problem(s))",
            style("FAILED").red().bold(),
            verdict.fatal().count()
        )?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_run;

    #[test]
    fn test_text_lenient_run_passes() {
        let (summary, verdict) = test_run(false);
        let text = console::strip_ansi_codes(&render(&summary, &verdict).expect("render"))
            .into_owned();
        assert!(text.contains("Types: 2"));
        assert!(text.contains("Domains: 0"));
        assert!(text.contains("PROBLEMS (2 total, 0 fatal, 1 warning(s))"));
        assert!(text.contains("illegal lower-to-higher 1"));
        assert!(text.contains("WARN  IllegalReference: com.a.X:A:L0:0:com.b.Y:B:L1:1"));
        assert!(text.contains("lower layer depends on higher layer"));
        assert!(text.contains("Result: PASSED (lenient)"));
    }

    #[test]
    fn test_text_strict_run_fails() {
        let (summary, verdict) = test_run(true);
        let text = console::strip_ansi_codes(&render(&summary, &verdict).expect("render"))
            .into_owned();
        assert!(text.contains("FATAL IllegalReference"));
        assert!(text.contains("WARN  ClassBothReferringAndIgnored"));
        assert!(text.contains("Result: FAILED (strict, 1 fatal problem(s))"));
    }

    #[test]
    fn test_text_no_problems() {
        let summary = Summary::default();
        let verdict = crate::problems::ProblemSink::new().finalize(true);
        let text = console::strip_ansi_codes(&render(&summary, &verdict).expect("render"))
            .into_owned();
        assert!(text.contains("No problems found"));
        assert!(text.contains("PASSED"));
    }
}
