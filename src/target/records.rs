//! Raw records of a target specification document.
//!
//! Every record keeps the keys it does not recognise so the loader can report
//! them by name instead of failing on the first one.

use serde::Deserialize;
use std::collections::BTreeMap;

pub(crate) type UnknownKeys = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub(crate) struct TargetDocument {
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
    #[serde(default)]
    pub domains: Vec<DomainRecord>,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LayerRecord {
    pub name: String,
    pub depth: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComponentRecord {
    pub name: String,
    pub layer: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

/// Describe unrecognised keys: the key itself when there is one, else the
/// sorted list.
pub(crate) fn describe_unknown(unknown: &UnknownKeys) -> Option<String> {
    match unknown.len() {
        0 => None,
        1 => unknown.keys().next().map(|k| format!("'{k}'")),
        _ => Some(format!(
            "[{}]",
            unknown.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        )),
    }
}
