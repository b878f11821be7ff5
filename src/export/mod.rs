//! Graph exports
//!
//! Two granularities (types, components) times two edge sets (all, illegal),
//! each rendered as:
//! - `<g>-<s>.txt`: one `from:to:KIND` line per edge
//! - `<g>-<s>-nodes.txt` / `<g>-<s>-edges.txt`: tab-separated node and edge lists
//! - `<g>-<s>.dot`: Graphviz digraph with illegal edges in red
//!
//! Rendering is pure; only [`write_exports`] touches the filesystem.

use crate::ignores::SEPARATOR;
use crate::models::{ErrorKind, Problem, ReferenceKind};
use crate::pipeline::Analysis;
use crate::problems::ProblemSink;
use anyhow::{Context, Result};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Node and edge granularity of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Types,
    Components,
}

impl Granularity {
    fn as_str(self) -> &'static str {
        match self {
            Granularity::Types => "types",
            Granularity::Components => "components",
        }
    }
}

/// Which edges an export contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSet {
    All,
    Illegal,
}

impl EdgeSet {
    fn as_str(self) -> &'static str {
        match self {
            EdgeSet::All => "all",
            EdgeSet::Illegal => "illegal",
        }
    }

    fn admits(self, kind: ReferenceKind) -> bool {
        match self {
            EdgeSet::All => true,
            EdgeSet::Illegal => kind.is_illegal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExportNode {
    pub name: String,
    /// Owning component, for type nodes
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExportEdge {
    pub from: String,
    pub to: String,
    pub kind: ReferenceKind,
}

/// One granularity and edge set, ready to render
#[derive(Debug, Clone)]
pub struct ExportGraph {
    pub granularity: Granularity,
    pub edges_set: EdgeSet,
    pub nodes: BTreeSet<ExportNode>,
    pub edges: BTreeSet<ExportEdge>,
}

impl ExportGraph {
    /// Type-level graph. The full graph lists every correlated type; the
    /// illegal graph only the endpoints of illegal edges.
    pub fn types(analysis: &Analysis, set: EdgeSet) -> Self {
        let mut nodes = BTreeSet::new();
        let mut edges = BTreeSet::new();
        if set == EdgeSet::All {
            for (component, members) in &analysis.correlation.members {
                nodes.extend(members.iter().map(|name| ExportNode {
                    name: name.clone(),
                    component: Some(component.clone()),
                }));
            }
        }
        for reference in &analysis.correlation.references {
            if !set.admits(reference.kind) {
                continue;
            }
            for end in [&reference.from, &reference.to] {
                nodes.insert(ExportNode {
                    name: end.name.clone(),
                    component: Some(end.component.clone()),
                });
            }
            edges.insert(ExportEdge {
                from: reference.from.name.clone(),
                to: reference.to.name.clone(),
                kind: reference.kind,
            });
        }
        Self {
            granularity: Granularity::Types,
            edges_set: set,
            nodes,
            edges,
        }
    }

    /// Component-level graph. The full graph lists every declared component.
    pub fn components(analysis: &Analysis, set: EdgeSet) -> Self {
        let mut nodes = BTreeSet::new();
        let mut edges = BTreeSet::new();
        if set == EdgeSet::All {
            nodes.extend(analysis.target.components().map(|c| ExportNode {
                name: c.name.clone(),
                component: None,
            }));
        }
        for reference in analysis.correlation.component_references() {
            if !set.admits(reference.kind) {
                continue;
            }
            for name in [&reference.from, &reference.to] {
                nodes.insert(ExportNode {
                    name: name.clone(),
                    component: None,
                });
            }
            edges.insert(ExportEdge {
                from: reference.from,
                to: reference.to,
                kind: reference.kind,
            });
        }
        Self {
            granularity: Granularity::Components,
            edges_set: set,
            nodes,
            edges,
        }
    }

    /// File name stem, e.g. `types-illegal`
    pub fn stem(&self) -> String {
        format!("{}-{}", self.granularity.as_str(), self.edges_set.as_str())
    }

    /// One `from:to:KIND` line per edge
    pub fn render_plain(&self) -> String {
        self.edges
            .iter()
            .map(|e| format!("{}{SEPARATOR}{}{SEPARATOR}{}\n", e.from, e.to, e.kind))
            .collect()
    }

    pub fn render_nodes(&self) -> String {
        self.nodes
            .iter()
            .map(|n| match &n.component {
                Some(component) => format!("{}\t{}\n", n.name, component),
                None => format!("{}\n", n.name),
            })
            .collect()
    }

    pub fn render_edges(&self) -> String {
        self.edges
            .iter()
            .map(|e| format!("{}\t{}\n", e.from, e.to))
            .collect()
    }

    /// Graphviz rendering; illegal edges are drawn red
    pub fn render_dot(&self) -> String {
        let mut graph: DiGraph<String, ReferenceKind> = DiGraph::new();
        let mut indices: FxHashMap<&str, NodeIndex> = FxHashMap::default();
        for node in &self.nodes {
            indices.insert(node.name.as_str(), graph.add_node(node.name.clone()));
        }
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) =
                (indices.get(edge.from.as_str()), indices.get(edge.to.as_str()))
            {
                graph.add_edge(from, to, edge.kind);
            }
        }

        let dot = Dot::with_attr_getters(
            &graph,
            &[Config::EdgeNoLabel],
            &|_, edge| {
                if edge.weight().is_illegal() {
                    "color=red".to_string()
                } else {
                    String::new()
                }
            },
            &|_, _| String::new(),
        );
        format!("{dot}")
    }

    /// Every rendering of this graph as `(file name, contents)`
    pub fn files(&self) -> Vec<ExportFile> {
        let stem = self.stem();
        vec![
            ExportFile::new(format!("{stem}.txt"), self.render_plain()),
            ExportFile::new(format!("{stem}-nodes.txt"), self.render_nodes()),
            ExportFile::new(format!("{stem}-edges.txt"), self.render_edges()),
            ExportFile::new(format!("{stem}.dot"), self.render_dot()),
        ]
    }
}

/// A rendered export waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub contents: String,
}

impl ExportFile {
    fn new(name: String, contents: String) -> Self {
        Self { name, contents }
    }
}

/// Render every granularity and edge set
pub fn render_exports(analysis: &Analysis) -> Vec<ExportFile> {
    let mut files = Vec::new();
    for set in [EdgeSet::All, EdgeSet::Illegal] {
        files.extend(ExportGraph::types(analysis, set).files());
        files.extend(ExportGraph::components(analysis, set).files());
    }
    debug!("Rendered {} export file(s)", files.len());
    files
}

/// Write rendered exports into `dir`, creating it if needed.
///
/// A file that cannot be created or written is an error. A file whose final
/// flush fails is reported as a `ResourceRelease` warning and left out of the
/// returned paths.
pub fn write_exports(
    dir: &Path,
    files: &[ExportFile],
    sink: &mut ProblemSink,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    write_exports_with(dir, files, sink, |path| File::create(path))
}

/// Write each file through a writer obtained from `open`
fn write_exports_with<W: Write>(
    dir: &Path,
    files: &[ExportFile],
    sink: &mut ProblemSink,
    mut open: impl FnMut(&Path) -> io::Result<W>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        let handle = open(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        if write_export(handle, &path, file, sink)? {
            written.push(path);
        }
    }
    info!("Wrote {} export file(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// Write one export. Returns `false` when the final flush failed.
fn write_export<W: Write>(
    writer: W,
    path: &Path,
    file: &ExportFile,
    sink: &mut ProblemSink,
) -> Result<bool> {
    let mut writer = BufWriter::new(writer);
    writer
        .write_all(file.contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if let Err(e) = writer.flush() {
        warn!("Failed to flush {}: {}", path.display(), e);
        sink.add(
            Problem::new(ErrorKind::ResourceRelease, path.display().to_string())
                .with_detail(format!("export could not be closed cleanly: {e}")),
        );
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use std::fs;
    use tempfile::tempdir;

    const TARGET: &str = r#"
layers: [{name: L0, depth: 0}, {name: L1, depth: 1}]
components:
  - {name: A, layer: L0, packages: ["com.a."]}
  - {name: B, layer: L1, packages: ["com.b."]}
  - {name: C, layer: L1, packages: ["com.c."]}
"#;

    const DEPS: &str = r#"<type name="com.a.X">
<depends-on name="com.b.Y"/>
<depends-on name="com.a.Z"/>
<type name="com.a.Z">
<type name="com.b.Y">
<depends-on name="com.a.X"/>
"#;

    fn analysis(dir: &Path) -> Analysis {
        let target = dir.join("arch.yaml");
        let deps = dir.join("deps.xml");
        fs::write(&target, TARGET).expect("write target");
        fs::write(&deps, DEPS).expect("write deps");
        Pipeline::new(target, deps).run().expect("run")
    }

    #[test]
    fn test_type_exports() {
        let dir = tempdir().expect("tempdir");
        let analysis = analysis(dir.path());

        let all = ExportGraph::types(&analysis, EdgeSet::All);
        assert_eq!(all.stem(), "types-all");
        assert_eq!(
            all.render_plain(),
            "com.a.X:com.a.Z:INTRA_COMPONENT\n\
             com.a.X:com.b.Y:INTER_COMPONENT_ILLEGAL_LOWER_TO_HIGHER\n\
             com.b.Y:com.a.X:INTER_COMPONENT_LEGAL\n"
        );
        assert_eq!(all.render_nodes(), "com.a.X\tA\ncom.a.Z\tA\ncom.b.Y\tB\n");

        let illegal = ExportGraph::types(&analysis, EdgeSet::Illegal);
        assert_eq!(illegal.render_edges(), "com.a.X\tcom.b.Y\n");
        assert_eq!(illegal.nodes.len(), 2);
    }

    #[test]
    fn test_component_exports() {
        let dir = tempdir().expect("tempdir");
        let analysis = analysis(dir.path());

        let all = ExportGraph::components(&analysis, EdgeSet::All);
        assert_eq!(all.render_nodes(), "A\nB\nC\n");
        assert_eq!(
            all.render_plain(),
            "A:B:INTER_COMPONENT_ILLEGAL_LOWER_TO_HIGHER\nB:A:INTER_COMPONENT_LEGAL\n"
        );

        let illegal = ExportGraph::components(&analysis, EdgeSet::Illegal);
        assert_eq!(illegal.render_nodes(), "A\nB\n");
        let dot = illegal.render_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("color=red"));
    }

    #[test]
    fn test_write_exports() {
        let dir = tempdir().expect("tempdir");
        let mut analysis = analysis(dir.path());
        let out = dir.path().join("out");

        let files = render_exports(&analysis);
        assert_eq!(files.len(), 16);
        let written = write_exports(&out, &files, &mut analysis.problems).expect("write");
        assert_eq!(written.len(), 16);
        assert!(out.join("components-illegal.dot").exists());
        assert_eq!(
            fs::read_to_string(out.join("types-illegal.txt")).expect("read"),
            "com.a.X:com.b.Y:INTER_COMPONENT_ILLEGAL_LOWER_TO_HIGHER\n"
        );
        assert_eq!(analysis.problems.count_of(ErrorKind::ResourceRelease), 0);
    }

    /// Accepts every write; fails the flush when `broken`
    struct FlakyWriter {
        broken: bool,
        bytes: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.broken {
                Err(io::Error::new(io::ErrorKind::Other, "device gone"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_failed_flush_is_a_resource_release_warning() {
        let dir = tempdir().expect("tempdir");
        let mut analysis = analysis(dir.path());
        let out = dir.path().join("out");
        let files = render_exports(&analysis);

        let written = write_exports_with(&out, &files, &mut analysis.problems, |path| {
            Ok(FlakyWriter {
                broken: path.ends_with("types-illegal.dot"),
                bytes: Vec::new(),
            })
        })
        .expect("write");

        assert_eq!(written.len(), files.len() - 1);
        assert!(!written.contains(&out.join("types-illegal.dot")));
        assert_eq!(analysis.problems.count_of(ErrorKind::ResourceRelease), 1);

        let verdict = analysis.finalize(false);
        assert!(verdict.passed());
        let release = verdict
            .problems
            .iter()
            .find(|p| p.kind == ErrorKind::ResourceRelease)
            .expect("release warning");
        assert!(release.description.ends_with("types-illegal.dot"));
        assert!(!verdict.is_fatal(release));
    }
}
