//! Conformance pipeline
//!
//! Orchestrates one full run:
//! 1. Load and validate the target architecture
//! 2. Build the ignore index
//! 3. Parse the dependency extraction file into a type graph
//! 4. Apply reflections, then fix-unresolveds
//! 5. Report unresolved names
//! 6. Build the rollup index and correlate types to components
//!
//! Structural errors stop the run with `Err(Problem)`. Everything else lands
//! in the [`Analysis`] problem set for the caller to finalize.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::correlate::{self, Correlation, ProblemGranularity};
use crate::graph::{extraction, supplemental, TypeGraph};
use crate::ignores::IgnoreIndex;
use crate::models::{Problem, Summary};
use crate::problems::{ProblemSink, Verdict};
use crate::rollup::RollUpIndex;
use crate::target::Target;

/// Full conformance pipeline over a set of input files.
#[derive(Debug, Clone)]
pub struct Pipeline {
    target: PathBuf,
    dependencies: PathBuf,
    ignores: Option<PathBuf>,
    reflections: Option<PathBuf>,
    fix_unresolveds: Option<PathBuf>,
    /// Keep `Outer$Inner` names instead of folding them into `Outer`
    preserve_nested: bool,
    granularity: ProblemGranularity,
}

impl Pipeline {
    /// Create a pipeline over a target specification and an extraction file.
    pub fn new(target: impl Into<PathBuf>, dependencies: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            dependencies: dependencies.into(),
            ignores: None,
            reflections: None,
            fix_unresolveds: None,
            preserve_nested: false,
            granularity: ProblemGranularity::default(),
        }
    }

    pub fn with_ignores(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.ignores = path.map(Into::into);
        self
    }

    pub fn with_reflections(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.reflections = path.map(Into::into);
        self
    }

    pub fn with_fix_unresolveds(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.fix_unresolveds = path.map(Into::into);
        self
    }

    pub fn preserve_nested(mut self, preserve: bool) -> Self {
        self.preserve_nested = preserve;
        self
    }

    pub fn granularity(mut self, granularity: ProblemGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Run every phase in order.
    pub fn run(&self) -> Result<Analysis, Problem> {
        let target = Target::load(&self.target)?;

        let ignores = match &self.ignores {
            Some(path) => IgnoreIndex::load(path)?,
            None => IgnoreIndex::new(),
        };

        let mut problems = ProblemSink::new();
        let mut graph = extraction::load(&self.dependencies, &ignores, self.preserve_nested)?;

        if let Some(path) = &self.reflections {
            supplemental::load_reflections(
                path,
                &mut graph,
                &ignores,
                self.preserve_nested,
                &mut problems,
            )?;
        }
        if let Some(path) = &self.fix_unresolveds {
            supplemental::load_fix_unresolveds(
                path,
                &mut graph,
                &ignores,
                self.preserve_nested,
                &mut problems,
            )?;
        }

        graph.report_unresolved(&mut problems);

        let rollup = RollUpIndex::build(&target);
        let correlation =
            correlate::correlate(&mut graph, &target, &rollup, &mut problems, self.granularity)?;

        let summary = summarize(&target, &graph, &correlation);
        info!(
            "Run complete: {} type(s), {} reference(s), {} illegal, {} problem(s)",
            summary.types,
            summary.references,
            summary.illegal(),
            problems.len()
        );

        Ok(Analysis {
            target,
            graph,
            rollup,
            correlation,
            summary,
            problems,
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target
    }

    pub fn dependencies_path(&self) -> &Path {
        &self.dependencies
    }
}

fn summarize(target: &Target, graph: &TypeGraph, correlation: &Correlation) -> Summary {
    let mut summary = Summary {
        layers: target.layer_count(),
        domains: target.domains().count(),
        components: target.component_count(),
        types: graph.len(),
        unresolved_names: graph.unresolved().len(),
        ..Default::default()
    };
    summary.count_references(&correlation.references);
    debug!("Summary: {:?}", summary);
    summary
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct Analysis {
    pub target: Target,
    pub graph: TypeGraph,
    pub rollup: RollUpIndex,
    pub correlation: Correlation,
    pub summary: Summary,
    pub problems: ProblemSink,
}

impl Analysis {
    /// Decide pass or fail under the given policy.
    pub fn finalize(&self, strict: bool) -> Verdict {
        self.problems.finalize(strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;
    use std::fs;
    use tempfile::tempdir;

    const TARGET: &str = r#"
layers: [{name: L0, depth: 0}, {name: L1, depth: 1}]
components:
  - {name: A, layer: L0, packages: ["com.a."]}
  - {name: B, layer: L1, packages: ["com.b."]}
"#;

    const DEPS: &str = r#"<type name="com.a.X">
<depends-on name="com.b.Y"/>
<type name="com.b.Y">
<depends-on name="com.a.X"/>
"#;

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new("arch.yaml", "deps.xml")
            .with_ignores(Some("ignores.txt"))
            .with_reflections(None::<PathBuf>)
            .preserve_nested(true)
            .granularity(ProblemGranularity::Component);

        assert_eq!(pipeline.target_path(), Path::new("arch.yaml"));
        assert_eq!(pipeline.dependencies_path(), Path::new("deps.xml"));
        assert_eq!(pipeline.ignores, Some(PathBuf::from("ignores.txt")));
        assert!(pipeline.reflections.is_none());
        assert!(pipeline.preserve_nested);
        assert_eq!(pipeline.granularity, ProblemGranularity::Component);
    }

    #[test]
    fn test_run_end_to_end() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("arch.yaml");
        let deps = dir.path().join("deps.xml");
        fs::write(&target, TARGET)?;
        fs::write(&deps, DEPS)?;

        let analysis = Pipeline::new(&target, &deps).run()?;
        assert_eq!(analysis.summary.types, 2);
        assert_eq!(analysis.summary.references, 2);
        assert_eq!(analysis.summary.legal, 1);
        assert_eq!(analysis.summary.illegal_lower_to_higher, 1);
        assert_eq!(analysis.problems.count_of(ErrorKind::IllegalReference), 1);
        assert!(analysis.finalize(false).passed());
        assert!(!analysis.finalize(true).passed());
        Ok(())
    }

    #[test]
    fn test_missing_optional_file_is_file_read() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("arch.yaml");
        let deps = dir.path().join("deps.xml");
        fs::write(&target, TARGET)?;
        fs::write(&deps, DEPS)?;

        let err = Pipeline::new(&target, &deps)
            .with_ignores(Some(dir.path().join("nope.txt")))
            .run()
            .expect_err("missing ignores file");
        assert_eq!(err.kind, ErrorKind::FileRead);
        Ok(())
    }
}
