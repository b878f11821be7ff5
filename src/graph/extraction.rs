//! Dependency extraction file loader
//!
//! Streams the extraction file once. A `<type name="X">` line opens code unit
//! `X`; each `<depends-on name="Y">` line that follows adds `X -> Y` until the
//! next unit opens. Everything else on the line-oriented format is skipped.

use super::names::{classify, denested_name, ExtractionLine};
use super::TypeGraph;
use crate::ignores::IgnoreIndex;
use crate::input;
use crate::models::{ErrorKind, Problem};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

/// Load the extraction file at `path`
pub fn load(
    path: &Path,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
) -> Result<TypeGraph, Problem> {
    let reader = input::open(path)?;
    let graph = parse(reader, &path.display().to_string(), ignores, preserve_nested)?;
    info!(
        "Loaded {} type(s) from {} ({} unresolved name(s))",
        graph.len(),
        path.display(),
        graph.unresolved().len()
    );
    Ok(graph)
}

/// Parse an extraction stream and resolve its references.
///
/// Types matching `ignores` are never created, and their dependency lines are
/// dropped with them. Referenced names are denested unless `preserve_nested`,
/// then dropped if they are ignored or point back at the referring type.
pub fn parse<R: BufRead>(
    reader: R,
    source: &str,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
) -> Result<TypeGraph, Problem> {
    let mut graph = TypeGraph::new();
    // None while no unit is open, or while the open unit is ignored
    let mut current: Option<String> = None;
    let mut ignored_types = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| input::read_error(source, &e))?;
        let Some(parsed) = classify(&line) else {
            continue;
        };

        match parsed {
            ExtractionLine::Type(raw) => {
                let name = checked_name(raw, preserve_nested, source, idx, &line)?;
                if ignores.skip(name) {
                    debug!("Ignoring type {}", name);
                    ignored_types += 1;
                    current = None;
                    continue;
                }
                graph.entry(name);
                current = Some(name.to_string());
            }
            ExtractionLine::DependsOn(raw) => {
                let to = checked_name(raw, preserve_nested, source, idx, &line)?;
                let Some(from) = current.as_deref() else {
                    debug!("{}:{}: dependency outside an open type", source, idx + 1);
                    continue;
                };
                if to == from || ignores.skip(to) {
                    continue;
                }
                graph.add_reference(from, to);
            }
        }
    }

    debug!("Skipped {} ignored type declaration(s)", ignored_types);
    graph.resolve_references();
    Ok(graph)
}

/// The denested name of an element, rejecting empty and bare-package names
fn checked_name<'a>(
    raw: &'a str,
    preserve_nested: bool,
    source: &str,
    idx: usize,
    line: &str,
) -> Result<&'a str, Problem> {
    let malformed = |detail: &str| {
        Problem::new(
            ErrorKind::MalformedDependencyLine,
            format!("{}:{}: '{}'", source, idx + 1, line.trim()),
        )
        .with_detail(detail.to_string())
    };
    if raw.is_empty() {
        return Err(malformed("element has no name"));
    }
    denested_name(raw, preserve_nested)
        .ok_or_else(|| malformed("no type name is left once the nested part is stripped"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str, ignores: &IgnoreIndex, preserve_nested: bool) -> TypeGraph {
        parse(text.as_bytes(), "deps.xml", ignores, preserve_nested).expect("valid extraction")
    }

    fn ignores(text: &str) -> IgnoreIndex {
        IgnoreIndex::from_reader(text.as_bytes(), "ignores.txt").expect("valid ignores")
    }

    const TWO_WAY: &str = r#"<?xml version="1.0"?>
<dependencies>
  <type name="com.a.X">
    <depends-on name="com.b.Y"/>
    <depends-on name="com.a.X"/>
    <depends-on name="java.lang.String"/>
  </type>
  <type name="com.b.Y">
    <depends-on name="com.a.X"/>
  </type>
</dependencies>
"#;

    #[test]
    fn test_parse_types_and_references() {
        let graph = parse_str(TWO_WAY, &IgnoreIndex::new(), false);
        assert_eq!(graph.len(), 2);

        let x = graph.get("com.a.X").expect("X");
        assert!(x.references.contains("com.b.Y"));
        assert!(!x.reference_names.contains("com.a.X"), "self-reference dropped");
        assert!(graph.is_unresolved("java.lang.String"));

        let y = graph.get("com.b.Y").expect("Y");
        assert!(y.references.contains("com.a.X"));
    }

    #[test]
    fn test_ignored_referenced_name_is_dropped() {
        let graph = parse_str(TWO_WAY, &ignores("java\n"), false);
        let x = graph.get("com.a.X").expect("X");
        assert!(!x.reference_names.contains("java.lang.String"));
        assert!(graph.unresolved().is_empty());
    }

    #[test]
    fn test_ignored_type_and_its_dependencies_vanish() {
        let text = r#"
<type name="com.ignored.Z">
  <depends-on name="com.kept.W"/>
</type>
<type name="com.kept.W">
</type>
"#;
        let graph = parse_str(text, &ignores("com.ignored\n"), false);
        assert!(graph.get("com.ignored.Z").is_none());
        assert!(graph.unresolved().is_empty());
        assert!(graph.sorted().iter().all(|t| t.reference_names.is_empty()));
    }

    #[test]
    fn test_dependencies_resume_after_ignored_type() {
        let text = r#"
<type name="com.ignored.Z">
<depends-on name="com.x.Missing"/>
<type name="com.kept.W">
<depends-on name="com.x.Missing"/>
"#;
        let graph = parse_str(text, &ignores("com.ignored\n"), false);
        assert_eq!(graph.len(), 1);
        assert!(graph.is_unresolved("com.x.Missing"));
    }

    #[test]
    fn test_nested_types_fold_into_enclosing_type() {
        let text = r#"
<type name="com.a.X">
<depends-on name="com.a.X$Inner"/>
<depends-on name="com.b.Y$Builder"/>
<type name="com.a.X$Inner">
<depends-on name="com.b.Y"/>
<type name="com.b.Y">
"#;
        let graph = parse_str(text, &IgnoreIndex::new(), false);
        assert_eq!(graph.len(), 2);
        let x = graph.get("com.a.X").expect("X");
        assert_eq!(
            x.reference_names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["com.b.Y"]
        );
    }

    #[test]
    fn test_preserve_nested_keeps_inner_types() {
        let text = r#"
<type name="com.a.X">
<depends-on name="com.a.X$Inner"/>
<type name="com.a.X$Inner">
"#;
        let graph = parse_str(text, &IgnoreIndex::new(), true);
        assert_eq!(graph.len(), 2);
        assert!(graph
            .get("com.a.X")
            .map(|t| t.references.contains("com.a.X$Inner"))
            .unwrap_or(false));
    }

    #[test]
    fn test_repeated_declaration_reuses_type() {
        let text = r#"
<type name="com.a.X">
<depends-on name="com.b.Y"/>
<type name="com.a.X">
<depends-on name="com.c.Z"/>
"#;
        let graph = parse_str(text, &IgnoreIndex::new(), false);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("com.a.X").map(|t| t.reference_names.len()), Some(2));
    }

    #[test]
    fn test_separator_names_are_skipped() {
        let text = r#"
<type name="com.a:X">
<depends-on name="com.b.Y"/>
<type name="com.b.Y">
<depends-on name="bad:name"/>
"#;
        let graph = parse_str(text, &IgnoreIndex::new(), false);
        assert_eq!(graph.len(), 1);
        assert!(graph.unresolved().is_empty());
    }

    #[test]
    fn test_dependency_before_any_type_is_skipped() {
        let text = "<depends-on name=\"com.b.Y\"/>\n<type name=\"com.a.X\">\n";
        let graph = parse_str(text, &IgnoreIndex::new(), false);
        assert_eq!(graph.len(), 1);
        assert!(graph.unresolved().is_empty());
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = parse(
            "<type name=\"com.a.X\">\n<depends-on name=\"\"/>\n".as_bytes(),
            "deps.xml",
            &IgnoreIndex::new(),
            false,
        )
        .expect_err("malformed");
        assert_eq!(err.kind, ErrorKind::MalformedDependencyLine);
        assert!(err.description.starts_with("deps.xml:2"));
    }

    #[test]
    fn test_name_empty_after_denesting_is_malformed() {
        for text in [
            "<type name=\"com.a.X\">\n<depends-on name=\"com.sun.proxy.$Proxy12\"/>\n",
            "<type name=\"$X\">\n",
        ] {
            let err = parse(text.as_bytes(), "deps.xml", &IgnoreIndex::new(), false)
                .expect_err("malformed");
            assert_eq!(err.kind, ErrorKind::MalformedDependencyLine);
        }

        let graph = parse_str(
            "<type name=\"com.a.X\">\n<depends-on name=\"com.sun.proxy.$Proxy12\"/>\n",
            &IgnoreIndex::new(),
            true,
        );
        assert!(graph.is_unresolved("com.sun.proxy.$Proxy12"));
    }
}
