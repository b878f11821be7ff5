//! RollUp index: longest-prefix-match from names to owning components
//!
//! Every package and class claim in the target is flattened into one list
//! sorted in descending lexicographic order. When two claims both prefix a
//! name, the longer one sorts first, so a linear scan that returns the first
//! hit always yields the most specific owner regardless of declaration order.

use crate::target::Target;
use rustc_hash::FxHashMap;
use tracing::debug;

/// One flattened claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollUpEntry {
    /// Package prefix ending in `.`, or an exact class name
    pub key: String,
    pub component: String,
    pub exact: bool,
}

impl RollUpEntry {
    fn matches(&self, name: &str) -> bool {
        if self.exact {
            self.key == name
        } else {
            name.starts_with(&self.key)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RollUpIndex {
    entries: Vec<RollUpEntry>,
    /// Exact class claims, index into `entries`
    classes: FxHashMap<String, usize>,
}

impl RollUpIndex {
    /// Flatten every component's claims out of a validated target
    pub fn build(target: &Target) -> Self {
        let claims = target.components().flat_map(|component| {
            let packages = component
                .packages
                .iter()
                .map(move |p| (p.clone(), component.name.clone(), false));
            let classes = component
                .classes
                .iter()
                .map(move |c| (c.clone(), component.name.clone(), true));
            packages.chain(classes)
        });
        let index = Self::from_claims(claims);
        debug!(
            "Built rollup index with {} claim(s) ({} exact)",
            index.entries.len(),
            index.classes.len()
        );
        index
    }

    /// Build from raw `(key, component, exact)` claims, in any order
    pub fn from_claims(claims: impl IntoIterator<Item = (String, String, bool)>) -> Self {
        let mut entries: Vec<RollUpEntry> = claims
            .into_iter()
            .map(|(key, component, exact)| RollUpEntry {
                key,
                component,
                exact,
            })
            .collect();
        entries.sort_by(|a, b| b.key.cmp(&a.key).then(b.exact.cmp(&a.exact)));

        let classes = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.exact)
            .map(|(idx, e)| (e.key.clone(), idx))
            .collect();

        Self { entries, classes }
    }

    /// Owning component of `name`. An exact class claim beats any package
    /// prefix; otherwise the longest matching prefix wins.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some(&idx) = self.classes.get(name) {
            return Some(self.entries[idx].component.as_str());
        }
        self.entries
            .iter()
            .find(|entry| entry.matches(name))
            .map(|entry| entry.component.as_str())
    }

    /// Claims in scan order
    pub fn entries(&self) -> &[RollUpEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DocumentFormat;

    fn claims(list: &[(&str, &str, bool)]) -> RollUpIndex {
        RollUpIndex::from_claims(
            list.iter()
                .map(|(k, c, e)| (k.to_string(), c.to_string(), *e)),
        )
    }

    #[test]
    fn test_longest_prefix_wins_in_any_order() {
        let forward = claims(&[("com.a.", "Outer", false), ("com.a.b.", "Inner", false)]);
        let backward = claims(&[("com.a.b.", "Inner", false), ("com.a.", "Outer", false)]);
        for index in [&forward, &backward] {
            assert_eq!(index.resolve("com.a.b.X"), Some("Inner"));
            assert_eq!(index.resolve("com.a.c.X"), Some("Outer"));
            assert_eq!(index.resolve("com.a.X"), Some("Outer"));
            assert_eq!(index.resolve("org.X"), None);
        }
    }

    #[test]
    fn test_sibling_prefix_is_not_a_match() {
        let index = claims(&[("com.a.b.", "B", false), ("com.a.bc.", "BC", false)]);
        assert_eq!(index.resolve("com.a.bc.X"), Some("BC"));
        assert_eq!(index.resolve("com.a.b.X"), Some("B"));
        assert_eq!(index.resolve("com.a.bcd.X"), None);
    }

    #[test]
    fn test_exact_class_beats_package() {
        let index = claims(&[
            ("com.a.", "A", false),
            ("com.a.b.", "AB", false),
            ("com.a.Main", "Boot", true),
        ]);
        assert_eq!(index.resolve("com.a.Main"), Some("Boot"));
        assert_eq!(index.resolve("com.a.MainHelper"), Some("A"));
    }

    #[test]
    fn test_entries_sorted_descending() {
        let index = claims(&[
            ("com.a.", "A", false),
            ("com.z.", "Z", false),
            ("com.a.b.", "AB", false),
        ]);
        let keys: Vec<&str> = index.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["com.z.", "com.a.b.", "com.a."]);
    }

    #[test]
    fn test_build_from_target() {
        let text = r#"
layers: [{name: L0, depth: 0}, {name: L1, depth: 1}]
components:
  - {name: B, layer: L1, packages: ["com.acme.web"]}
  - {name: A, layer: L0, packages: ["com.acme."], classes: ["com.acme.web.Boot"]}
"#;
        let target = Target::parse(text, DocumentFormat::Yaml).expect("valid target");
        let index = RollUpIndex::build(&target);
        assert_eq!(index.len(), 3);
        assert_eq!(index.resolve("com.acme.web.Page"), Some("B"));
        assert_eq!(index.resolve("com.acme.web.Boot"), Some("A"));
        assert_eq!(index.resolve("com.acme.model.User"), Some("A"));
        // The package claim was normalised, so `com.acme.webapp` is not inside it
        assert_eq!(index.resolve("com.acme.webapp.Page"), Some("A"));
    }
}
