//! CLI definition and handler

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{load_config_file, load_project_config, ProjectConfig};
use crate::correlate::ProblemGranularity;
use crate::export;
use crate::models::Summary;
use crate::pipeline::Pipeline;
use crate::problems::ProblemSink;
use crate::reporters::{self, OutputFormat};

/// archgate - Architecture conformance checking
///
/// Correlates a dependency extraction with a declared target architecture and
/// reports every reference that crosses layers the wrong way.
#[derive(Parser, Debug)]
#[command(name = "archgate")]
#[command(
    version,
    about = "Check a dependency graph against declared layers and components",
    long_about = "archgate loads a target architecture (layers with depths, optional domains, \
and components claiming package prefixes and classes), parses a dependency extraction file, \
rolls every type up to its owning component and classifies each reference.\n\n\
A higher-depth layer may depend on a lower-depth one. References between different \
components on the same layer, or from a lower layer to a higher one, are illegal.",
    after_help = "\
Examples:
  archgate arch.yaml deps.xml                          Check, report findings as warnings
  archgate arch.yaml deps.xml --strict                 Fail on any illegal or unresolved reference
  archgate arch.yaml deps.xml --ignores ignores.txt    Exclude generated or third-party names
  archgate arch.yaml deps.xml --format json -o out.json
  archgate arch.yaml deps.xml --export-dir arch-out    Write graph exports (txt, dot)"
)]
pub struct Cli {
    /// Target architecture specification (YAML, TOML or JSON)
    pub target: PathBuf,

    /// Dependency extraction file
    pub dependencies: PathBuf,

    /// Ignores file: one prefix per line, trailing `!` for an exact name
    #[arg(long, env = "ARCHGATE_IGNORES")]
    pub ignores: Option<PathBuf>,

    /// Reflections file: `from:to1,to2` edges static extraction cannot see
    #[arg(long)]
    pub reflections: Option<PathBuf>,

    /// Fix-unresolveds file: `from:to1,to2` stubs for unresolved names
    #[arg(long)]
    pub fix_unresolveds: Option<PathBuf>,

    /// Keep nested type names (`Outer$Inner`) instead of folding them into the enclosing type
    #[arg(long)]
    pub preserve_nested: bool,

    /// Treat illegal and unresolved references as fatal errors
    #[arg(long)]
    pub strict: bool,

    /// Report illegal references per type edge or per component pair
    #[arg(long, value_parser = ["type", "component"])]
    pub granularity: Option<String>,

    /// Output format: text, json
    #[arg(long, short = 'f', value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Output file path (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write graph exports into this directory
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Configuration file (default: archgate.toml in the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Debug logging (same as --log-level debug)
    #[arg(long)]
    pub debug: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

impl Cli {
    /// Effective log level after `--debug`
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

/// Settings merged from CLI flags, config file and defaults
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub ignores: Option<PathBuf>,
    pub reflections: Option<PathBuf>,
    pub fix_unresolveds: Option<PathBuf>,
    pub preserve_nested: bool,
    pub strict: bool,
    pub granularity: ProblemGranularity,
    pub format: OutputFormat,
    pub export_dir: Option<PathBuf>,
}

impl Settings {
    /// CLI flags win over the config file, which wins over defaults
    pub(crate) fn merge(cli: &Cli, config: &ProjectConfig) -> Result<Self> {
        let granularity = match &cli.granularity {
            Some(g) => g.parse::<ProblemGranularity>().map_err(anyhow::Error::msg)?,
            None => config.analysis.problem_granularity.unwrap_or_default(),
        };
        let format = match &cli.format {
            Some(f) => f.parse::<OutputFormat>()?,
            None => config.output.format.unwrap_or_default(),
        };
        Ok(Self {
            ignores: cli.ignores.clone().or_else(|| config.ignores()),
            reflections: cli.reflections.clone().or_else(|| config.reflections()),
            fix_unresolveds: cli
                .fix_unresolveds
                .clone()
                .or_else(|| config.fix_unresolveds()),
            preserve_nested: cli.preserve_nested
                || config.analysis.preserve_nested.unwrap_or(false),
            strict: cli.strict || config.analysis.strict.unwrap_or(false),
            granularity,
            format,
            export_dir: cli.export_dir.clone().or_else(|| config.export_dir()),
        })
    }
}

/// Run a conformance check. Returns whether the run passed.
pub fn run(cli: Cli) -> Result<bool> {
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let config = match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => load_project_config(Path::new(".")),
    };
    let settings = Settings::merge(&cli, &config)?;
    debug!("Effective settings: {:?}", settings);

    let pipeline = Pipeline::new(&cli.target, &cli.dependencies)
        .with_ignores(settings.ignores.clone())
        .with_reflections(settings.reflections.clone())
        .with_fix_unresolveds(settings.fix_unresolveds.clone())
        .preserve_nested(settings.preserve_nested)
        .granularity(settings.granularity);

    let (summary, verdict) = match pipeline.run() {
        Ok(mut analysis) => {
            if let Some(dir) = &settings.export_dir {
                let files = export::render_exports(&analysis);
                export::write_exports(dir, &files, &mut analysis.problems)?;
            }
            let verdict = analysis.finalize(settings.strict);
            (analysis.summary, verdict)
        }
        Err(problem) => {
            info!("Run stopped on structural error: {}", problem);
            let mut sink = ProblemSink::new();
            sink.add(problem);
            (Summary::default(), sink.finalize(settings.strict))
        }
    };

    let rendered = reporters::report(&summary, &verdict, settings.format)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    if let Some(failure) = &verdict.failure {
        eprintln!("{} {}", style("error:").red().bold(), failure.rendered());
    }
    Ok(verdict.passed())
}
