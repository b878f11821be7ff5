//! Configuration module for archgate
//!
//! This module handles:
//! - Project-level configuration (archgate.toml)
//! - Default input files, analysis switches and output settings

mod project_config;

pub use project_config::{
    load_config_file, load_project_config, AnalysisConfig, InputsConfig, OutputConfig,
    ProjectConfig,
};
