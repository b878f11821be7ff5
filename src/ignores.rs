//! Ignore index
//!
//! Built once from a line-oriented ignores file. Each line names either a
//! prefix or, with a trailing `!`, one exact name:
//!
//! ```text
//! # generated code
//! com.acme.generated        prefix, normalised to `com.acme.generated.`
//! com.acme.legacy..         explicit prefix, collapsed to `com.acme.legacy.`
//! com.acme.Main!            exact name `com.acme.Main`
//! ```

use crate::input::{self, is_blank_or_comment};
use crate::models::{ErrorKind, Problem};
use rustc_hash::FxHashSet;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// Reserved separator of the supplemental and export formats. Names carrying
/// it are malformed upstream data.
pub const SEPARATOR: char = ':';

/// One normalised ignores-file entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IgnoreEntry {
    pub pattern: String,
    pub exact: bool,
}

/// Normalise one ignores-file line.
///
/// Returns `None` for blank and comment lines. The pattern may come out empty
/// (a line of only dots or a lone `!`); [`IgnoreIndex::from_reader`] rejects those.
pub fn normalize(line: &str) -> Option<IgnoreEntry> {
    if is_blank_or_comment(line) {
        return None;
    }
    let line = line.trim();

    if let Some(exact) = line.strip_suffix('!') {
        return Some(IgnoreEntry {
            pattern: exact.to_string(),
            exact: true,
        });
    }

    let stem = line.trim_end_matches('.');
    Some(IgnoreEntry {
        pattern: format!("{stem}."),
        exact: false,
    })
}

/// Normalised set of excluded prefixes and exact names
#[derive(Debug, Clone, Default)]
pub struct IgnoreIndex {
    prefixes: Vec<String>,
    exact: FxHashSet<String>,
}

impl IgnoreIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from an ignores file on disk
    pub fn load(path: &Path) -> Result<Self, Problem> {
        let reader = input::open(path)?;
        let index = Self::from_reader(reader, &path.display().to_string())?;
        debug!(
            "Loaded {} ignore prefix(es) and {} exact name(s) from {}",
            index.prefixes.len(),
            index.exact.len(),
            path.display()
        );
        Ok(index)
    }

    /// Build the index from any line source; `source` labels error messages
    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self, Problem> {
        let mut index = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| input::read_error(source, &e))?;
            let Some(entry) = normalize(&line) else {
                continue;
            };
            if entry.pattern.is_empty() || entry.pattern == "." {
                return Err(Problem::new(
                    ErrorKind::MalformedIgnoreEntry,
                    format!("{}:{}: '{}'", source, idx + 1, line.trim()),
                )
                .with_detail("ignore entry names nothing once normalised"));
            }
            index.insert(entry);
        }
        Ok(index)
    }

    pub fn insert(&mut self, entry: IgnoreEntry) {
        if entry.exact {
            self.exact.insert(entry.pattern);
        } else if !self.prefixes.contains(&entry.pattern) {
            self.prefixes.push(entry.pattern);
        }
    }

    /// Whether `name` is excluded from the graph
    pub fn skip(&self, name: &str) -> bool {
        if name.contains(SEPARATOR) {
            return true;
        }
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len() + self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
