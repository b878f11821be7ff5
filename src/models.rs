//! Core data models for archgate
//!
//! These models are shared by every phase of a run: the closed problem
//! taxonomy with its severity policy, resolved references between code units
//! and the counters printed in the run summary.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// How a problem affects the final verdict
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, never fails the run
    #[default]
    Warning,
    /// Analysis finding: fails the run only in strict mode
    Analysis,
    /// Structural error: always fails the run
    Structural,
}

impl Severity {
    /// Whether a problem of this severity fails the run under the given policy
    pub fn is_fatal(self, strict: bool) -> bool {
        match self {
            Severity::Structural => true,
            Severity::Analysis => strict,
            Severity::Warning => false,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Analysis => write!(f, "analysis"),
            Severity::Structural => write!(f, "structural"),
        }
    }
}

/// Closed taxonomy of everything a run can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // Input files
    FileRead,
    MalformedDependencyLine,
    MalformedIgnoreEntry,
    MalformedClassToClassReference,
    MissingReferredToClass,

    // Target specification
    TargetParse,
    UnrecognizedTargetKey,
    UnrecognizedLayerKey,
    UnrecognizedDomainKey,
    UnrecognizedComponentKey,
    DuplicateLayerDepth,
    DuplicateLayerName,
    DuplicateDomainName,
    DuplicateComponentName,
    MissingComponentDomain,
    UnknownComponentLayer,
    UnknownComponentDomain,
    DuplicatePackageName,
    DuplicateClassName,

    // Correlation
    TypeNotResolvedToComponent,

    // Analysis findings
    UnresolvedReference,
    IllegalReference,
    IllegalComponentReference,
    SupplementalTypeNotNeeded,

    // Warnings
    ClassBothReferringAndIgnored,
    ClassBothReferredToAndIgnored,
    ResourceRelease,

    /// Wrapper for a verdict with more than one fatal problem
    MultipleErrors,
}

impl ErrorKind {
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::UnresolvedReference
            | ErrorKind::IllegalReference
            | ErrorKind::IllegalComponentReference
            | ErrorKind::SupplementalTypeNotNeeded => Severity::Analysis,
            ErrorKind::ClassBothReferringAndIgnored
            | ErrorKind::ClassBothReferredToAndIgnored
            | ErrorKind::ResourceRelease => Severity::Warning,
            _ => Severity::Structural,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FileRead => "FileRead",
            ErrorKind::MalformedDependencyLine => "MalformedDependencyLine",
            ErrorKind::MalformedIgnoreEntry => "MalformedIgnoreEntry",
            ErrorKind::MalformedClassToClassReference => "MalformedClassToClassReference",
            ErrorKind::MissingReferredToClass => "MissingReferredToClass",
            ErrorKind::TargetParse => "TargetParse",
            ErrorKind::UnrecognizedTargetKey => "UnrecognizedTargetKey",
            ErrorKind::UnrecognizedLayerKey => "UnrecognizedLayerKey",
            ErrorKind::UnrecognizedDomainKey => "UnrecognizedDomainKey",
            ErrorKind::UnrecognizedComponentKey => "UnrecognizedComponentKey",
            ErrorKind::DuplicateLayerDepth => "DuplicateLayerDepth",
            ErrorKind::DuplicateLayerName => "DuplicateLayerName",
            ErrorKind::DuplicateDomainName => "DuplicateDomainName",
            ErrorKind::DuplicateComponentName => "DuplicateComponentName",
            ErrorKind::MissingComponentDomain => "MissingComponentDomain",
            ErrorKind::UnknownComponentLayer => "UnknownComponentLayer",
            ErrorKind::UnknownComponentDomain => "UnknownComponentDomain",
            ErrorKind::DuplicatePackageName => "DuplicatePackageName",
            ErrorKind::DuplicateClassName => "DuplicateClassName",
            ErrorKind::TypeNotResolvedToComponent => "TypeNotResolvedToComponent",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::IllegalReference => "IllegalReference",
            ErrorKind::IllegalComponentReference => "IllegalComponentReference",
            ErrorKind::SupplementalTypeNotNeeded => "SupplementalTypeNotNeeded",
            ErrorKind::ClassBothReferringAndIgnored => "ClassBothReferringAndIgnored",
            ErrorKind::ClassBothReferredToAndIgnored => "ClassBothReferredToAndIgnored",
            ErrorKind::ResourceRelease => "ResourceRelease",
            ErrorKind::MultipleErrors => "MultipleErrors",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding or error.
///
/// `description` is the identity key: two problems with the same description
/// are the same problem, whatever their detail says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {description}")]
pub struct Problem {
    pub description: String,
    pub kind: ErrorKind,
    #[serde(default)]
    pub detail: Option<String>,
}

impl Problem {
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_fatal(&self, strict: bool) -> bool {
        self.severity().is_fatal(strict)
    }

    /// Canonical string form, used for deterministic ordering
    pub fn canonical(&self) -> String {
        format!("{}: {}", self.kind, self.description)
    }

    /// Canonical form followed by the detail, if any
    pub fn rendered(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}\n    {}", self.canonical(), detail),
            None => self.canonical(),
        }
    }
}

/// Legality classification of a reference between two correlated types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    /// Both endpoints belong to the same component
    IntraComponent,
    /// Referring layer is deeper than the referred-to layer
    InterComponentLegal,
    /// Different components on layers of equal depth
    InterComponentIllegalSameLayer,
    /// Referring layer is shallower than the referred-to layer
    InterComponentIllegalLowerToHigher,
}

impl ReferenceKind {
    /// Classify a reference from the owning components and their layer depths.
    ///
    /// Domains play no part: only component identity and depth matter.
    pub fn classify(from_component: &str, from_depth: i64, to_component: &str, to_depth: i64) -> Self {
        if from_component == to_component {
            return ReferenceKind::IntraComponent;
        }
        match from_depth.cmp(&to_depth) {
            Ordering::Greater => ReferenceKind::InterComponentLegal,
            Ordering::Equal => ReferenceKind::InterComponentIllegalSameLayer,
            Ordering::Less => ReferenceKind::InterComponentIllegalLowerToHigher,
        }
    }

    pub fn is_illegal(self) -> bool {
        matches!(
            self,
            ReferenceKind::InterComponentIllegalSameLayer
                | ReferenceKind::InterComponentIllegalLowerToHigher
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::IntraComponent => "INTRA_COMPONENT",
            ReferenceKind::InterComponentLegal => "INTER_COMPONENT_LEGAL",
            ReferenceKind::InterComponentIllegalSameLayer => "INTER_COMPONENT_ILLEGAL_SAME_LAYER",
            ReferenceKind::InterComponentIllegalLowerToHigher => {
                "INTER_COMPONENT_ILLEGAL_LOWER_TO_HIGHER"
            }
        }
    }

    fn explain(self) -> &'static str {
        match self {
            ReferenceKind::IntraComponent => "same component",
            ReferenceKind::InterComponentLegal => "higher layer depends on lower layer",
            ReferenceKind::InterComponentIllegalSameLayer => "components on the same layer",
            ReferenceKind::InterComponentIllegalLowerToHigher => {
                "lower layer depends on higher layer"
            }
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a reference, with everything needed to explain its legality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub component: String,
    pub layer: String,
    pub depth: i64,
}

impl Endpoint {
    fn parseable(&self) -> String {
        format!("{}:{}:{}:{}", self.name, self.component, self.layer, self.depth)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (component {}, layer {}, depth {})",
            self.name, self.component, self.layer, self.depth
        )
    }
}

/// Directed edge between two correlated types.
///
/// Equality, hashing and ordering only look at the endpoint names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub from: Endpoint,
    pub to: Endpoint,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        let kind = ReferenceKind::classify(&from.component, from.depth, &to.component, to.depth);
        Self { from, to, kind }
    }

    fn key(&self) -> (&str, &str) {
        (&self.from.name, &self.to.name)
    }

    /// Machine-readable form: both endpoints as `name:component:layer:depth`
    pub fn parseable(&self) -> String {
        format!("{}:{}", self.from.parseable(), self.to.parseable())
    }

    /// Human-readable sentence describing both endpoints and the verdict
    pub fn explain(&self) -> String {
        format!("{} references {}: {}", self.from, self.to, self.kind.explain())
    }

    /// Convert an illegal reference into a type-level problem
    pub fn to_problem(&self) -> Option<Problem> {
        if !self.kind.is_illegal() {
            return None;
        }
        Some(Problem::new(ErrorKind::IllegalReference, self.parseable()).with_detail(self.explain()))
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// References between two components, rolled up from type-level references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentReference {
    pub from: String,
    pub from_layer: String,
    pub from_depth: i64,
    pub to: String,
    pub to_layer: String,
    pub to_depth: i64,
    pub kind: ReferenceKind,
    /// Number of type-level references behind this edge
    pub count: usize,
}

impl ComponentReference {
    pub fn parseable(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.from, self.from_layer, self.from_depth, self.to, self.to_layer, self.to_depth
        )
    }

    pub fn to_problem(&self) -> Option<Problem> {
        if !self.kind.is_illegal() {
            return None;
        }
        let detail = format!(
            "component {} (layer {}, depth {}) references component {} (layer {}, depth {}) \
             through {} type reference(s): {}",
            self.from,
            self.from_layer,
            self.from_depth,
            self.to,
            self.to_layer,
            self.to_depth,
            self.count,
            self.kind.explain()
        );
        Some(Problem::new(ErrorKind::IllegalComponentReference, self.parseable()).with_detail(detail))
    }
}

/// Counters for the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub layers: usize,
    pub domains: usize,
    pub components: usize,
    pub types: usize,
    pub unresolved_names: usize,
    pub references: usize,
    pub intra_component: usize,
    pub legal: usize,
    pub illegal_same_layer: usize,
    pub illegal_lower_to_higher: usize,
}

impl Summary {
    pub fn count_references<'a>(&mut self, references: impl IntoIterator<Item = &'a Reference>) {
        for reference in references {
            self.references += 1;
            match reference.kind {
                ReferenceKind::IntraComponent => self.intra_component += 1,
                ReferenceKind::InterComponentLegal => self.legal += 1,
                ReferenceKind::InterComponentIllegalSameLayer => self.illegal_same_layer += 1,
                ReferenceKind::InterComponentIllegalLowerToHigher => {
                    self.illegal_lower_to_higher += 1
                }
            }
        }
    }

    pub fn illegal(&self) -> usize {
        self.illegal_same_layer + self.illegal_lower_to_higher
    }
}
