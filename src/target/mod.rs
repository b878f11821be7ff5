//! Target architecture model
//!
//! Loads the declared layers, domains and components from a YAML, TOML or
//! JSON document and validates it. Any violation here is structural: loading
//! stops at the first one.
//!
//! ```yaml
//! layers:
//!   - { name: core, depth: 0 }
//!   - { name: app, depth: 1 }
//! components:
//!   - name: model
//!     layer: core
//!     packages: ["com.acme.model."]
//!   - name: web
//!     layer: app
//!     packages: ["com.acme.web."]
//!     classes: ["com.acme.Main"]
//! ```

mod records;

use crate::input;
use crate::models::{ErrorKind, Problem};
use records::{describe_unknown, ComponentRecord, TargetDocument};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// A named architectural rank; deeper layers may depend on shallower ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub depth: i64,
    pub description: Option<String>,
}

/// Descriptive grouping of components; plays no part in legality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub description: Option<String>,
}

/// Ownership unit mapping name patterns to a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub layer: String,
    pub domain: Option<String>,
    pub description: Option<String>,
    /// Package prefixes, each ending in `.`
    pub packages: BTreeSet<String>,
    /// Exact fully-qualified names
    pub classes: BTreeSet<String>,
}

/// Supported target document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick a format from the file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => DocumentFormat::Toml,
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// The declared architecture. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Target {
    layers: BTreeMap<String, Layer>,
    domains: BTreeMap<String, Domain>,
    components: BTreeMap<String, Component>,
}

impl Target {
    /// Load and validate a target specification file
    pub fn load(path: &Path) -> Result<Self, Problem> {
        let text = input::read_to_string(path)?;
        let target = Self::parse(&text, DocumentFormat::from_path(path))?;
        info!(
            "Loaded target from {}: {} layer(s), {} domain(s), {} component(s)",
            path.display(),
            target.layers.len(),
            target.domains.len(),
            target.components.len()
        );
        Ok(target)
    }

    /// Parse and validate a target specification document
    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self, Problem> {
        let value = parse_document(text, format)?;
        let document: TargetDocument = serde_json::from_value(value).map_err(|e| {
            Problem::new(ErrorKind::TargetParse, "invalid target specification")
                .with_detail(e.to_string())
        })?;
        Self::from_document(document)
    }

    fn from_document(document: TargetDocument) -> Result<Self, Problem> {
        if let Some(keys) = describe_unknown(&document.unknown) {
            return Err(Problem::new(
                ErrorKind::UnrecognizedTargetKey,
                format!("unrecognized key(s) {keys} in target specification"),
            ));
        }
        for layer in &document.layers {
            if let Some(keys) = describe_unknown(&layer.unknown) {
                return Err(Problem::new(
                    ErrorKind::UnrecognizedLayerKey,
                    format!("unrecognized key(s) {keys} in layer '{}'", layer.name),
                ));
            }
        }
        for domain in &document.domains {
            if let Some(keys) = describe_unknown(&domain.unknown) {
                return Err(Problem::new(
                    ErrorKind::UnrecognizedDomainKey,
                    format!("unrecognized key(s) {keys} in domain '{}'", domain.name),
                ));
            }
        }
        for component in &document.components {
            if let Some(keys) = describe_unknown(&component.unknown) {
                return Err(Problem::new(
                    ErrorKind::UnrecognizedComponentKey,
                    format!("unrecognized key(s) {keys} in component '{}'", component.name),
                ));
            }
        }

        let mut target = Target::default();

        let mut depths: BTreeMap<i64, &str> = BTreeMap::new();
        for layer in &document.layers {
            if let Some(other) = depths.insert(layer.depth, &layer.name) {
                return Err(Problem::new(
                    ErrorKind::DuplicateLayerDepth,
                    format!(
                        "layers '{}' and '{}' share depth {}",
                        other, layer.name, layer.depth
                    ),
                ));
            }
        }

        for layer in document.layers {
            if target.layers.contains_key(&layer.name) {
                return Err(Problem::new(
                    ErrorKind::DuplicateLayerName,
                    format!("layer '{}' is declared more than once", layer.name),
                ));
            }
            target.layers.insert(
                layer.name.clone(),
                Layer {
                    name: layer.name,
                    depth: layer.depth,
                    description: layer.description,
                },
            );
        }

        for domain in document.domains {
            if target.domains.contains_key(&domain.name) {
                return Err(Problem::new(
                    ErrorKind::DuplicateDomainName,
                    format!("domain '{}' is declared more than once", domain.name),
                ));
            }
            target.domains.insert(
                domain.name.clone(),
                Domain {
                    name: domain.name,
                    description: domain.description,
                },
            );
        }

        let mut seen = BTreeSet::new();
        for component in &document.components {
            if !seen.insert(component.name.as_str()) {
                return Err(Problem::new(
                    ErrorKind::DuplicateComponentName,
                    format!("component '{}' is declared more than once", component.name),
                ));
            }
        }

        if !target.domains.is_empty() {
            if let Some(component) = document.components.iter().find(|c| c.domain.is_none()) {
                return Err(Problem::new(
                    ErrorKind::MissingComponentDomain,
                    format!("component '{}' names no domain", component.name),
                )
                .with_detail("domains are declared, so every component must name one"));
            }
        }

        for component in &document.components {
            target.check_references(component)?;
        }

        let mut package_owners: BTreeMap<String, String> = BTreeMap::new();
        let mut class_owners: BTreeMap<String, String> = BTreeMap::new();
        for record in document.components {
            let packages: BTreeSet<String> =
                record.packages.iter().map(|p| normalize_package(p)).collect();
            for package in &packages {
                if let Some(owner) = package_owners.insert(package.clone(), record.name.clone()) {
                    return Err(Problem::new(
                        ErrorKind::DuplicatePackageName,
                        format!(
                            "package '{}' is claimed by components '{}' and '{}'",
                            package, owner, record.name
                        ),
                    ));
                }
            }
            let classes: BTreeSet<String> = record.classes.into_iter().collect();
            for class in &classes {
                if let Some(owner) = class_owners.insert(class.clone(), record.name.clone()) {
                    return Err(Problem::new(
                        ErrorKind::DuplicateClassName,
                        format!(
                            "class '{}' is claimed by components '{}' and '{}'",
                            class, owner, record.name
                        ),
                    ));
                }
            }
            debug!(
                "Component '{}': layer '{}', {} package(s), {} class(es)",
                record.name,
                record.layer,
                packages.len(),
                classes.len()
            );
            target.components.insert(
                record.name.clone(),
                Component {
                    name: record.name,
                    layer: record.layer,
                    domain: record.domain,
                    description: record.description,
                    packages,
                    classes,
                },
            );
        }

        Ok(target)
    }

    fn check_references(&self, component: &ComponentRecord) -> Result<(), Problem> {
        if !self.layers.contains_key(&component.layer) {
            return Err(Problem::new(
                ErrorKind::UnknownComponentLayer,
                format!(
                    "component '{}' names undeclared layer '{}'",
                    component.name, component.layer
                ),
            ));
        }
        if let Some(domain) = &component.domain {
            if !self.domains.contains_key(domain) {
                return Err(Problem::new(
                    ErrorKind::UnknownComponentDomain,
                    format!(
                        "component '{}' names undeclared domain '{}'",
                        component.name, domain
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// The layer a component sits on
    pub fn layer_of(&self, component: &str) -> Option<&Layer> {
        self.components
            .get(component)
            .and_then(|c| self.layer(&c.layer))
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

/// Package claims always end in `.`, so `com.a` and `com.a.` are one claim
pub fn normalize_package(package: &str) -> String {
    format!("{}.", package.trim().trim_end_matches('.'))
}

fn parse_document(text: &str, format: DocumentFormat) -> Result<serde_json::Value, Problem> {
    let parsed = match format {
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<serde_json::Value>(text).map_err(|e| e.to_string())
        }
        DocumentFormat::Toml => toml::from_str::<serde_json::Value>(text).map_err(|e| e.to_string()),
        DocumentFormat::Json => {
            serde_json::from_str::<serde_json::Value>(text).map_err(|e| e.to_string())
        }
    };
    match parsed {
        // An empty YAML document declares nothing
        Ok(serde_json::Value::Null) => Ok(serde_json::Value::Object(Default::default())),
        Ok(value) => Ok(value),
        Err(e) => Err(Problem::new(
            ErrorKind::TargetParse,
            format!("invalid {format:?} target specification"),
        )
        .with_detail(e)),
    }
}
