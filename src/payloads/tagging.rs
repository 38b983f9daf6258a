use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Body of a `tagging` request: tags to add and remove on a set of nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggingDelta {
    pub nodes: Vec<String>,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl TaggingDelta {
    pub fn new<N, A, R>(nodes: N, add: A, remove: R) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            add: dedup(add.into_iter().map(Into::into)),
            remove: dedup(remove.into_iter().map(Into::into)),
        }
    }

    /// True when submitting would change nothing: nothing to remove and
    /// every target node already carries exactly the tags being added.
    pub fn is_noop(&self, current: &HashMap<String, BTreeSet<String>>) -> bool {
        if self.nodes.is_empty() || (self.add.is_empty() && self.remove.is_empty()) {
            return true;
        }
        if !self.remove.is_empty() {
            return false;
        }

        let wanted: BTreeSet<&str> = self.add.iter().map(String::as_str).collect();
        self.nodes.iter().all(|node| {
            current
                .get(node)
                .map(|tags| tags.iter().map(String::as_str).collect::<BTreeSet<_>>() == wanted)
                .unwrap_or(false)
        })
    }
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.filter(|t| seen.insert(t.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(entries: &[(&str, &[&str])]) -> HashMap<String, BTreeSet<String>> {
        entries
            .iter()
            .map(|(node, tags)| (node.to_string(), tags.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_same_tags_is_noop() {
        let state = current(&[("n1", &["A", "B"]), ("n2", &["B", "A"])]);
        let delta = TaggingDelta::new(["n1", "n2"], ["A", "B"], Vec::<String>::new());
        assert!(delta.is_noop(&state));
    }

    #[test]
    fn test_missing_tag_needs_write() {
        let state = current(&[("n1", &["A"]), ("n2", &["A", "B"])]);
        let delta = TaggingDelta::new(["n1", "n2"], ["A", "B"], Vec::<String>::new());
        assert!(!delta.is_noop(&state));
    }

    #[test]
    fn test_extra_tag_needs_write() {
        let state = current(&[("n1", &["A", "B", "C"])]);
        let delta = TaggingDelta::new(["n1"], ["A", "B"], Vec::<String>::new());
        assert!(!delta.is_noop(&state));
    }

    #[test]
    fn test_remove_always_writes() {
        let state = current(&[("n1", &["A"])]);
        let delta = TaggingDelta::new(["n1"], ["A"], ["Z"]);
        assert!(!delta.is_noop(&state));
    }

    #[test]
    fn test_untagged_node_needs_write() {
        let delta = TaggingDelta::new(["n1"], ["A"], Vec::<String>::new());
        assert!(!delta.is_noop(&HashMap::new()));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let delta = TaggingDelta::new(["n1"], ["A", "A", "B"], Vec::<String>::new());
        assert_eq!(delta.add, vec!["A".to_string(), "B".to_string()]);
    }
}
