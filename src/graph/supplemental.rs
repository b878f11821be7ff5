//! Supplemental edge files
//!
//! Both files use `from:to1,to2,...` lines (`#` comments and blank lines are
//! skipped):
//!
//! - **reflections** add edges static extraction cannot see. Unknown `to`
//!   names get a stub type; the edges are purely additive.
//! - **fix-unresolveds** satisfy names that are still unresolved. They never
//!   add edges: `from` must be a known type whose extracted references
//!   include `to`. Anything else is a `SupplementalTypeNotNeeded` finding.
//!
//! Names are denested the same way as the extraction. Ignored names on
//! either side drop the edge, with a warning when the other side is a real,
//! non-ignored name.

use super::names::denested_name;
use super::TypeGraph;
use crate::ignores::{IgnoreIndex, SEPARATOR};
use crate::input::{self, is_blank_or_comment};
use crate::models::{ErrorKind, Problem};
use crate::problems::ProblemSink;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

const LIST_SEPARATOR: char = ',';

/// Which supplemental file a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplementalKind {
    Reflections,
    FixUnresolveds,
}

impl SupplementalKind {
    fn label(self) -> &'static str {
        match self {
            SupplementalKind::Reflections => "reflection",
            SupplementalKind::FixUnresolveds => "fix-unresolved",
        }
    }
}

/// One parsed `from:to1,to2` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalLine {
    pub from: String,
    pub to: Vec<String>,
}

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(
    line: &str,
    kind: SupplementalKind,
    location: &str,
) -> Result<Option<SupplementalLine>, Problem> {
    if is_blank_or_comment(line) {
        return Ok(None);
    }
    let trimmed = line.trim();
    let malformed = |detail: &str| {
        Problem::new(
            ErrorKind::MalformedClassToClassReference,
            format!("{location}: '{trimmed}'"),
        )
        .with_detail(detail.to_string())
    };

    let Some((from, to)) = trimmed.split_once(SEPARATOR) else {
        return Err(malformed("expected 'from:to1,to2,...'"));
    };
    let from = from.trim();
    if from.is_empty() {
        return Err(malformed("missing referring class"));
    }

    let to: Vec<String> = to.split(LIST_SEPARATOR).map(|s| s.trim().to_string()).collect();
    if to.iter().any(|t| t.is_empty() || t.contains(SEPARATOR)) {
        return Err(match kind {
            SupplementalKind::Reflections => Problem::new(
                ErrorKind::MissingReferredToClass,
                format!("{location}: '{trimmed}'"),
            )
            .with_detail("every referred-to class must be named"),
            SupplementalKind::FixUnresolveds => malformed("empty or malformed referred-to class"),
        });
    }

    Ok(Some(SupplementalLine {
        from: from.to_string(),
        to,
    }))
}

/// Apply a reflections file at `path`
pub fn load_reflections(
    path: &Path,
    graph: &mut TypeGraph,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
    sink: &mut ProblemSink,
) -> Result<usize, Problem> {
    let reader = input::open(path)?;
    let source = path.display().to_string();
    let added = add_reflections(reader, &source, graph, ignores, preserve_nested, sink)?;
    info!("Added {} reflection edge(s) from {}", added, path.display());
    Ok(added)
}

/// Apply a fix-unresolveds file at `path`
pub fn load_fix_unresolveds(
    path: &Path,
    graph: &mut TypeGraph,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
    sink: &mut ProblemSink,
) -> Result<usize, Problem> {
    let reader = input::open(path)?;
    let source = path.display().to_string();
    let fixed = add_fix_unresolveds(reader, &source, graph, ignores, preserve_nested, sink)?;
    info!("Fixed {} unresolved name(s) from {}", fixed, path.display());
    Ok(fixed)
}

/// Add reflection-only edges, creating stub types for unknown targets.
///
/// Returns the number of edges added. The graph is re-resolved afterwards.
pub fn add_reflections<R: BufRead>(
    reader: R,
    source: &str,
    graph: &mut TypeGraph,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
    sink: &mut ProblemSink,
) -> Result<usize, Problem> {
    let mut added = 0;
    let kind = SupplementalKind::Reflections;
    for_each_edge(reader, source, kind, ignores, preserve_nested, sink, |from, to| {
        if !graph.contains(to) {
            debug!("Creating stub type {} for reflection from {}", to, from);
        }
        graph.entry(to);
        graph.add_reference(from, to);
        added += 1;
        Ok(())
    })?;
    graph.resolve_references();
    Ok(added)
}

/// Resolve still-unresolved names with stub types.
///
/// A line only applies when `to` is still unresolved and `from` is a known
/// type that refers to it. Returns the number of names fixed. The graph is
/// re-resolved afterwards.
pub fn add_fix_unresolveds<R: BufRead>(
    reader: R,
    source: &str,
    graph: &mut TypeGraph,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
    sink: &mut ProblemSink,
) -> Result<usize, Problem> {
    let mut fixed = 0;
    let mut not_needed = Vec::new();
    let kind = SupplementalKind::FixUnresolveds;
    for_each_edge(reader, source, kind, ignores, preserve_nested, sink, |from, to| {
        let reason = if !graph.is_unresolved(to) {
            Some(format!("{to} is not an unresolved name"))
        } else {
            match graph.get(from) {
                None => Some(format!("{from} is not a known type")),
                Some(ty) if !ty.reference_names.contains(to) => {
                    Some(format!("{from} does not refer to {to}"))
                }
                Some(_) => None,
            }
        };
        if let Some(reason) = reason {
            not_needed.push(
                Problem::new(
                    ErrorKind::SupplementalTypeNotNeeded,
                    format!("{from}{SEPARATOR}{to}"),
                )
                .with_detail(format!("fix-unresolved entry is not needed: {reason}")),
            );
            return Ok(());
        }
        graph.entry(to);
        graph.mark_resolved(to);
        fixed += 1;
        Ok(())
    })?;
    sink.extend(not_needed);
    graph.resolve_references();
    Ok(fixed)
}

/// Parse every line and call `apply` for each denested edge whose endpoints
/// are not ignored.
fn for_each_edge<R: BufRead>(
    reader: R,
    source: &str,
    kind: SupplementalKind,
    ignores: &IgnoreIndex,
    preserve_nested: bool,
    sink: &mut ProblemSink,
    mut apply: impl FnMut(&str, &str) -> Result<(), Problem>,
) -> Result<(), Problem> {
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| input::read_error(source, &e))?;
        let location = format!("{}:{}", source, idx + 1);
        let Some(entry) = parse_line(&line, kind, &location)? else {
            continue;
        };

        let from = usable_name(&entry.from, preserve_nested, &location, &line)?;
        let from_ignored = ignores.skip(from);
        for to in &entry.to {
            let to = usable_name(to, preserve_nested, &location, &line)?;
            let to_ignored = ignores.skip(to);
            if from_ignored && !to_ignored {
                sink.add(
                    Problem::new(
                        ErrorKind::ClassBothReferringAndIgnored,
                        format!("{}: {}", kind.label(), from),
                    )
                    .with_detail(format!(
                        "{} refers to {} in {} but is ignored; edge dropped",
                        from, to, location
                    )),
                );
            } else if to_ignored && !from_ignored {
                sink.add(
                    Problem::new(
                        ErrorKind::ClassBothReferredToAndIgnored,
                        format!("{}: {}", kind.label(), to),
                    )
                    .with_detail(format!(
                        "{} is referred to by {} in {} but is ignored; edge dropped",
                        to, from, location
                    )),
                );
            }
            if from_ignored || to_ignored || from == to {
                continue;
            }
            apply(from, to)?;
        }
    }
    Ok(())
}

fn usable_name<'a>(
    name: &'a str,
    preserve_nested: bool,
    location: &str,
    line: &str,
) -> Result<&'a str, Problem> {
    denested_name(name, preserve_nested).ok_or_else(|| {
        Problem::new(
            ErrorKind::MalformedClassToClassReference,
            format!("{location}: '{}'", line.trim()),
        )
        .with_detail(format!("'{name}' leaves no type name once denested"))
    })
}
