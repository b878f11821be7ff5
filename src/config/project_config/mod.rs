//! Project-level configuration support
//!
//! Loads per-project configuration from `archgate.toml`, `.archgaterc.json`,
//! or `.archgate.yaml` files in the working directory.
//!
//! # Configuration Format
//!
//! ```toml
//! # archgate.toml
//!
//! [inputs]
//! ignores = "arch/ignores.txt"
//! reflections = "arch/reflections.txt"
//! fix_unresolveds = "arch/fix-unresolveds.txt"
//!
//! [analysis]
//! strict = true
//! preserve_nested = false
//! problem_granularity = "component"
//!
//! [output]
//! format = "json"
//! export_dir = "arch-out"
//! ```
//!
//! Relative paths are resolved against the directory the file was found in.

use crate::correlate::ProblemGranularity;
use crate::reporters::OutputFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project-level configuration loaded from archgate.toml or similar
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Default supplemental input files
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Analysis switches
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report and export settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory the configuration was loaded from (not serialized)
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Optional input files
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    #[serde(default)]
    pub ignores: Option<PathBuf>,

    #[serde(default)]
    pub reflections: Option<PathBuf>,

    #[serde(default)]
    pub fix_unresolveds: Option<PathBuf>,
}

/// Analysis switches; unset values fall back to CLI defaults
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Promote analysis findings to fatal errors
    #[serde(default)]
    pub strict: Option<bool>,

    /// Keep nested type names instead of folding them into the enclosing type
    #[serde(default)]
    pub preserve_nested: Option<bool>,

    #[serde(default)]
    pub problem_granularity: Option<ProblemGranularity>,
}

/// Report and export settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Directory for graph exports
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Resolve a configured path against the configuration's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn ignores(&self) -> Option<PathBuf> {
        self.inputs.ignores.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn reflections(&self) -> Option<PathBuf> {
        self.inputs.reflections.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn fix_unresolveds(&self) -> Option<PathBuf> {
        self.inputs
            .fix_unresolveds
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    pub fn export_dir(&self) -> Option<PathBuf> {
        self.output.export_dir.as_deref().map(|p| self.resolve_path(p))
    }

    fn with_base_dir(mut self, path: &Path) -> Self {
        self.base_dir = path.parent().map(Path::to_path_buf);
        self
    }
}

/// Load project configuration from a directory.
///
/// Tries `archgate.toml`, then `.archgaterc.json`, then `.archgate.yaml` /
/// `.archgate.yml`. A file that fails to load is skipped with a warning.
/// Returns defaults when nothing loads.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    let candidates = [
        "archgate.toml",
        ".archgaterc.json",
        ".archgate.yaml",
        ".archgate.yml",
    ];
    for name in candidates {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load one configuration file, picking the format from its extension
pub fn load_config_file(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let config: ProjectConfig = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => toml::from_str(&content)?,
    };
    Ok(config.with_base_dir(path))
}
