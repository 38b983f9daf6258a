use regex_lite::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::generic_system::LagMode;

/// One generic-system link entry: the physical members that should bundle
/// into a single LAG
#[derive(Debug, Clone, PartialEq)]
pub struct LagEntry {
    pub members: Vec<LinkMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkMember {
    pub link_id: String,
    pub switch_if_name: String,
}

/// Body of a `leaf-server-link-labels` PATCH
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkLabels {
    pub links: BTreeMap<String, LinkLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkLabel {
    pub group_label: String,
    pub lag_mode: LagMode,
}

impl LinkLabels {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn physical_interface_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^((et|xe|ge|mge)-\d+/\d+/\d+(:\d+)?|(Ethernet|eth|swp)\d+(/\d+)*)$").ok()
        })
        .as_ref()
}

/// Whether an interface name looks like a physical front-panel port
pub fn is_physical_interface(if_name: &str) -> bool {
    physical_interface_pattern()
        .map(|re| re.is_match(if_name))
        .unwrap_or(false)
}

/// Label each entry's members `link1`, `link2`, ... (one number per entry,
/// however many members it has). Members with non-physical interface names
/// are left out.
pub fn build_link_labels(entries: &[LagEntry], lag_mode: LagMode) -> LinkLabels {
    let mut labels = LinkLabels::default();

    for (index, entry) in entries.iter().enumerate() {
        let group_label = format!("link{}", index + 1);
        for member in &entry.members {
            if !is_physical_interface(&member.switch_if_name) {
                tracing::debug!(if_name = %member.switch_if_name, "Skipping non-physical LAG member");
                continue;
            }
            labels.links.insert(
                member.link_id.clone(),
                LinkLabel {
                    group_label: group_label.clone(),
                    lag_mode,
                },
            );
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(link_id: &str, if_name: &str) -> LinkMember {
        LinkMember {
            link_id: link_id.to_string(),
            switch_if_name: if_name.to_string(),
        }
    }

    #[test]
    fn test_physical_interface_names() {
        assert!(is_physical_interface("et-0/0/1"));
        assert!(is_physical_interface("xe-0/0/12:3"));
        assert!(is_physical_interface("Ethernet12"));
        assert!(is_physical_interface("Ethernet1/4"));
        assert!(is_physical_interface("swp7"));
        assert!(!is_physical_interface("ae1"));
        assert!(!is_physical_interface("Port-Channel3"));
        assert!(!is_physical_interface("irb.100"));
        assert!(!is_physical_interface(""));
    }

    #[test]
    fn test_one_label_per_entry() {
        let entries = vec![
            LagEntry {
                members: vec![member("l1", "et-0/0/1"), member("l2", "et-0/0/1"), member("l3", "ae3")],
            },
            LagEntry {
                members: vec![member("l4", "et-0/0/2")],
            },
        ];
        let labels = build_link_labels(&entries, LagMode::LacpActive);

        assert_eq!(
            serde_json::to_value(&labels).unwrap(),
            json!({"links": {
                "l1": {"group_label": "link1", "lag_mode": "lacp_active"},
                "l2": {"group_label": "link1", "lag_mode": "lacp_active"},
                "l4": {"group_label": "link2", "lag_mode": "lacp_active"}
            }})
        );
    }

    #[test]
    fn test_no_physical_members_is_empty() {
        let entries = vec![LagEntry {
            members: vec![member("l1", "ae1")],
        }];
        assert!(build_link_labels(&entries, LagMode::StaticLag).is_empty());
    }
}
