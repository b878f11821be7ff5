//! Correlation of types to components and reference classification
//!
//! Every type in the graph must roll up to a component; one that does not is
//! a structural error and stops the run. Each resolved edge between two owned
//! types becomes a [`Reference`] classified by component identity and layer
//! depth. Illegal references are reported into the sink at the requested
//! granularity and never interrupt the pass.

use crate::graph::TypeGraph;
use crate::models::{ComponentReference, Endpoint, ErrorKind, Problem, Reference, ReferenceKind};
use crate::problems::ProblemSink;
use crate::rollup::RollUpIndex;
use crate::target::Target;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Level at which illegal references are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemGranularity {
    /// One `IllegalReference` per type-level edge
    #[default]
    Type,
    /// One `IllegalComponentReference` per component pair
    Component,
}

impl std::str::FromStr for ProblemGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" => Ok(ProblemGranularity::Type),
            "component" => Ok(ProblemGranularity::Component),
            _ => Err(format!(
                "Unknown problem granularity: {s}. Valid: type, component"
            )),
        }
    }
}

impl std::fmt::Display for ProblemGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemGranularity::Type => write!(f, "type"),
            ProblemGranularity::Component => write!(f, "component"),
        }
    }
}

/// Result of correlating a graph against a target
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    /// Every classified type-level reference, ordered by endpoint names
    pub references: BTreeSet<Reference>,
    /// Owned type names per component
    pub members: BTreeMap<String, BTreeSet<String>>,
}

impl Correlation {
    pub fn illegal(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(|r| r.kind.is_illegal())
    }

    pub fn component_of(&self, type_name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, members)| members.contains(type_name))
            .map(|(component, _)| component.as_str())
    }

    /// Inter-component references rolled up per component pair, in
    /// `(from, to)` order
    pub fn component_references(&self) -> Vec<ComponentReference> {
        let mut rolled: BTreeMap<(&str, &str), ComponentReference> = BTreeMap::new();
        for reference in &self.references {
            if reference.kind == ReferenceKind::IntraComponent {
                continue;
            }
            let key = (
                reference.from.component.as_str(),
                reference.to.component.as_str(),
            );
            rolled
                .entry(key)
                .or_insert_with(|| ComponentReference {
                    from: reference.from.component.clone(),
                    from_layer: reference.from.layer.clone(),
                    from_depth: reference.from.depth,
                    to: reference.to.component.clone(),
                    to_layer: reference.to.layer.clone(),
                    to_depth: reference.to.depth,
                    kind: reference.kind,
                    count: 0,
                })
                .count += 1;
        }
        rolled.into_values().collect()
    }
}

/// Correlate every type to its owning component and classify its references.
///
/// Fails on the first type (in name order) that no component claims. Illegal
/// references go into `sink` as `IllegalReference` or, at component
/// granularity, `IllegalComponentReference`.
pub fn correlate(
    graph: &mut TypeGraph,
    target: &Target,
    rollup: &RollUpIndex,
    sink: &mut ProblemSink,
    granularity: ProblemGranularity,
) -> Result<Correlation, Problem> {
    let mut owners: FxHashMap<String, (String, String, i64)> = FxHashMap::default();
    let mut correlation = Correlation::default();

    for ty in graph.sorted() {
        let Some(component) = rollup.resolve(&ty.name) else {
            return Err(Problem::new(ErrorKind::TypeNotResolvedToComponent, ty.name.clone())
                .with_detail(format!("no component claims {}", ty.name)));
        };
        let Some(layer) = target.layer_of(component) else {
            return Err(Problem::new(ErrorKind::TypeNotResolvedToComponent, ty.name.clone())
                .with_detail(format!("component '{component}' has no layer")));
        };
        owners.insert(
            ty.name.clone(),
            (component.to_string(), layer.name.clone(), layer.depth),
        );
        correlation
            .members
            .entry(component.to_string())
            .or_default()
            .insert(ty.name.clone());
    }

    let endpoint = |name: &str| {
        owners.get(name).map(|(component, layer, depth)| Endpoint {
            name: name.to_string(),
            component: component.clone(),
            layer: layer.clone(),
            depth: *depth,
        })
    };

    for ty in graph.sorted() {
        let Some(from) = endpoint(&ty.name) else {
            continue;
        };
        for name in &ty.references {
            if let Some(to) = endpoint(name) {
                correlation.references.insert(Reference::new(from.clone(), to));
            }
        }
    }

    for (name, (component, _, _)) in &owners {
        graph.set_component(name, component);
    }

    match granularity {
        ProblemGranularity::Type => {
            sink.extend(correlation.illegal().filter_map(Reference::to_problem));
        }
        ProblemGranularity::Component => {
            sink.extend(
                correlation
                    .component_references()
                    .iter()
                    .filter_map(ComponentReference::to_problem),
            );
        }
    }

    info!(
        "Correlated {} type(s) into {} component(s): {} reference(s), {} illegal",
        owners.len(),
        correlation.members.len(),
        correlation.references.len(),
        correlation.illegal().count()
    );
    debug!("Illegal references reported at {} granularity", granularity);
    Ok(correlation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeGraph;
    use crate::target::DocumentFormat;

    const TWO_LAYERS: &str = r#"
layers: [{name: L0, depth: 0}, {name: L1, depth: 1}]
components:
  - {name: A, layer: L0, packages: ["com.a."]}
  - {name: B, layer: L1, packages: ["com.b."]}
"#;

    fn target(text: &str) -> Target {
        Target::parse(text, DocumentFormat::Yaml).expect("valid target")
    }

    fn graph(edges: &[(&str, &str)]) -> TypeGraph {
        let mut graph = TypeGraph::new();
        for (from, to) in edges {
            graph.entry(from);
            graph.entry(to);
            graph.add_reference(from, to);
        }
        graph.resolve_references();
        graph
    }

    fn run(
        target: &Target,
        graph: &mut TypeGraph,
        granularity: ProblemGranularity,
    ) -> (Result<Correlation, Problem>, ProblemSink) {
        let rollup = RollUpIndex::build(target);
        let mut sink = ProblemSink::new();
        let result = correlate(graph, target, &rollup, &mut sink, granularity);
        (result, sink)
    }

    fn kind_of(correlation: &Correlation, from: &str, to: &str) -> Option<ReferenceKind> {
        correlation
            .references
            .iter()
            .find(|r| r.from.name == from && r.to.name == to)
            .map(|r| r.kind)
    }

    #[test]
    fn test_two_way_dependency_across_layers() {
        let target = target(TWO_LAYERS);
        let mut graph = graph(&[("com.a.X", "com.b.Y"), ("com.b.Y", "com.a.X")]);
        let (result, sink) = run(&target, &mut graph, ProblemGranularity::Type);
        let correlation = result.expect("correlates");

        assert_eq!(
            kind_of(&correlation, "com.a.X", "com.b.Y"),
            Some(ReferenceKind::InterComponentIllegalLowerToHigher)
        );
        assert_eq!(
            kind_of(&correlation, "com.b.Y", "com.a.X"),
            Some(ReferenceKind::InterComponentLegal)
        );
        assert_eq!(sink.count_of(ErrorKind::IllegalReference), 1);
        assert!(sink.contains("com.a.X:A:L0:0:com.b.Y:B:L1:1"));
        assert_eq!(
            graph.get("com.a.X").and_then(|t| t.component.as_deref()),
            Some("A")
        );
        assert_eq!(correlation.component_of("com.b.Y"), Some("B"));
    }

    #[test]
    fn test_unowned_type_fails_fast() {
        let target = target(TWO_LAYERS);
        let mut graph = graph(&[("com.a.X", "org.other.Q")]);
        let (result, sink) = run(&target, &mut graph, ProblemGranularity::Type);
        let err = result.expect_err("unowned type");
        assert_eq!(err.kind, ErrorKind::TypeNotResolvedToComponent);
        assert_eq!(err.description, "org.other.Q");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_same_layer_and_intra_component() {
        let target = target(
            r#"
layers: [{name: L0, depth: 0}]
components:
  - {name: A, layer: L0, packages: ["com.a."]}
  - {name: C, layer: L0, packages: ["com.c."]}
"#,
        );
        let mut graph = graph(&[("com.a.X", "com.a.Z"), ("com.a.X", "com.c.W")]);
        let (result, sink) = run(&target, &mut graph, ProblemGranularity::Type);
        let correlation = result.expect("correlates");
        assert_eq!(
            kind_of(&correlation, "com.a.X", "com.a.Z"),
            Some(ReferenceKind::IntraComponent)
        );
        assert_eq!(
            kind_of(&correlation, "com.a.X", "com.c.W"),
            Some(ReferenceKind::InterComponentIllegalSameLayer)
        );
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_domains_do_not_affect_legality() {
        let with_domains = target(
            r#"
layers: [{name: L0, depth: 0}, {name: L1, depth: 1}]
domains: [{name: left}, {name: right}]
components:
  - {name: A, layer: L0, domain: left, packages: ["com.a."]}
  - {name: B, layer: L1, domain: right, packages: ["com.b."]}
"#,
        );
        let without = target(TWO_LAYERS);
        let edges = [("com.a.X", "com.b.Y"), ("com.b.Y", "com.a.X")];

        let (a, _) = run(&with_domains, &mut graph(&edges), ProblemGranularity::Type);
        let (b, _) = run(&without, &mut graph(&edges), ProblemGranularity::Type);
        let kinds = |c: Correlation| c.references.iter().map(|r| r.kind).collect::<Vec<_>>();
        assert_eq!(kinds(a.expect("domains")), kinds(b.expect("no domains")));
    }

    #[test]
    fn test_component_granularity_rolls_up() {
        let target = target(TWO_LAYERS);
        let mut graph = graph(&[
            ("com.a.X", "com.b.Y"),
            ("com.a.W", "com.b.Y"),
            ("com.b.Y", "com.a.X"),
        ]);
        let (result, sink) = run(&target, &mut graph, ProblemGranularity::Component);
        let correlation = result.expect("correlates");

        assert_eq!(sink.count_of(ErrorKind::IllegalReference), 0);
        assert_eq!(sink.count_of(ErrorKind::IllegalComponentReference), 1);
        assert!(sink.contains("A:L0:0:B:L1:1"));

        let rolled = correlation.component_references();
        assert_eq!(rolled.len(), 2);
        let a_to_b = rolled.iter().find(|r| r.from == "A").expect("A -> B");
        assert_eq!(a_to_b.count, 2);
        assert_eq!(a_to_b.kind, ReferenceKind::InterComponentIllegalLowerToHigher);
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!(
            "Component".parse::<ProblemGranularity>(),
            Ok(ProblemGranularity::Component)
        );
        assert!("package".parse::<ProblemGranularity>().is_err());
        assert_eq!(ProblemGranularity::default().to_string(), "type");
    }
}
