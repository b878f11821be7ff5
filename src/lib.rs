//! archgate - Architecture conformance checking
//!
//! Loads a target architecture of layers, domains and components, builds a
//! type-level dependency graph from an extraction file, rolls every type up
//! to its owning component and classifies each reference by layer depth.
//!
//! Structural problems (unreadable or invalid input) stop a run with
//! `Err(Problem)`. Analysis findings are collected in a
//! [`problems::ProblemSink`] and only decide the outcome when the run is
//! finalized, strictly or not.

pub mod cli;
pub mod config;
pub mod correlate;
pub mod export;
pub mod graph;
pub mod ignores;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod problems;
pub mod reporters;
pub mod rollup;
pub mod target;
