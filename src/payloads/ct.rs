//! Connectivity-template policy trees.
//!
//! A template is submitted as a flat list of policy objects linked by id:
//! one `batch` root referencing its `pipeline` nodes, each pipeline
//! referencing one or two leaf policies. Ids are fresh uuids on every
//! [`ConnectivityTemplate::build`], so building twice yields two distinct
//! (but structurally identical) policy sets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    VlanTagged,
    Untagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    Tagged,
    Untagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv4Addressing {
    None,
    Numbered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv6Addressing {
    None,
    Numbered,
    LinkLocal,
}

/// Terminal policy carrying the actual attachment attributes
#[derive(Debug, Clone, PartialEq)]
pub enum LeafPolicy {
    SingleVlan {
        vn_node_id: String,
        tag_type: TagType,
    },
    MultipleVlan {
        untagged_vn_node_id: Option<String>,
        tagged_vn_node_ids: Vec<String>,
    },
    LogicalLink {
        security_zone: String,
        interface_type: InterfaceType,
        vlan_id: Option<u16>,
        ipv4: Ipv4Addressing,
        ipv6: Ipv6Addressing,
    },
    StaticRoute {
        network: String,
        share_ip_endpoint: bool,
    },
}

impl LeafPolicy {
    pub fn policy_type_name(&self) -> &'static str {
        match self {
            LeafPolicy::SingleVlan { .. } => "AttachSingleVLAN",
            LeafPolicy::MultipleVlan { .. } => "AttachMultipleVLAN",
            LeafPolicy::LogicalLink { .. } => "AttachLogicalLink",
            LeafPolicy::StaticRoute { .. } => "AttachStaticRoute",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LeafPolicy::SingleVlan { .. } => "Virtual Network (Single)",
            LeafPolicy::MultipleVlan { .. } => "Virtual Network (Multiple)",
            LeafPolicy::LogicalLink { .. } => "IP Link",
            LeafPolicy::StaticRoute { .. } => "Static Route",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            LeafPolicy::SingleVlan { .. } => "Add a single VLAN to interfaces, as tagged or untagged.",
            LeafPolicy::MultipleVlan { .. } => "Add a list of VLANs to interfaces, as tagged or untagged.",
            LeafPolicy::LogicalLink { .. } => {
                "Build an IP link between a fabric node and a generic system."
            }
            LeafPolicy::StaticRoute { .. } => {
                "Create a static route to a user defined subnet via the IP link next hop."
            }
        }
    }

    fn attributes(&self) -> PolicyAttributes {
        match self.clone() {
            LeafPolicy::SingleVlan { vn_node_id, tag_type } => {
                PolicyAttributes::SingleVlan { vn_node_id, tag_type }
            }
            LeafPolicy::MultipleVlan {
                untagged_vn_node_id,
                tagged_vn_node_ids,
            } => PolicyAttributes::MultipleVlan {
                untagged_vn_node_id,
                tagged_vn_node_ids,
            },
            LeafPolicy::LogicalLink {
                security_zone,
                interface_type,
                vlan_id,
                ipv4,
                ipv6,
            } => PolicyAttributes::LogicalLink {
                security_zone,
                interface_type,
                vlan_id,
                ipv4_addressing_type: ipv4,
                ipv6_addressing_type: ipv6,
            },
            LeafPolicy::StaticRoute {
                network,
                share_ip_endpoint,
            } => PolicyAttributes::StaticRoute {
                network,
                share_ip_endpoint,
            },
        }
    }
}

/// Pipeline stage: an ordered first and optional second subpolicy
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub first: LeafPolicy,
    pub second: Option<LeafPolicy>,
}

/// Typed description of a connectivity template before ids are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityTemplate {
    pub label: String,
    pub description: String,
    pub tags: Vec<String>,
    pub pipelines: Vec<Pipeline>,
}

impl ConnectivityTemplate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            tags: Vec::new(),
            pipelines: Vec::new(),
        }
    }

    pub fn with_pipeline(mut self, first: LeafPolicy, second: Option<LeafPolicy>) -> Self {
        self.pipelines.push(Pipeline { first, second });
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Template attaching one virtual network, tagged or untagged
    pub fn single_vlan(label: impl Into<String>, vn_node_id: impl Into<String>, tag_type: TagType) -> Self {
        Self::new(label).with_pipeline(
            LeafPolicy::SingleVlan {
                vn_node_id: vn_node_id.into(),
                tag_type,
            },
            None,
        )
    }

    /// Template building a numbered IPv4 link inside a routing zone
    pub fn ip_link(label: impl Into<String>, security_zone: impl Into<String>, vlan_id: Option<u16>) -> Self {
        let interface_type = match vlan_id {
            Some(_) => InterfaceType::Tagged,
            None => InterfaceType::Untagged,
        };
        Self::new(label).with_pipeline(
            LeafPolicy::LogicalLink {
                security_zone: security_zone.into(),
                interface_type,
                vlan_id,
                ipv4: Ipv4Addressing::Numbered,
                ipv6: Ipv6Addressing::None,
            },
            None,
        )
    }

    /// Assign fresh ids and wire batch -> pipelines -> leaves
    pub fn build(&self) -> PolicySet {
        let batch_id = new_policy_id();
        let mut pipelines_out = Vec::new();
        let mut leaves_out = Vec::new();
        let mut pipeline_ids = Vec::new();

        for pipeline in &self.pipelines {
            let first = leaf_object(&pipeline.first);
            let second = pipeline.second.as_ref().map(leaf_object);
            let pipeline_id = new_policy_id();

            pipelines_out.push(PolicyObject {
                id: pipeline_id.clone(),
                label: format!("{} (pipeline)", pipeline.first.label()),
                description: pipeline.first.description().to_string(),
                policy_type_name: "pipeline".to_string(),
                attributes: PolicyAttributes::Pipeline {
                    first_subpolicy: first.id.clone(),
                    second_subpolicy: second.as_ref().map(|s| s.id.clone()),
                },
                visible: false,
                tags: Vec::new(),
                user_data: None,
            });
            pipeline_ids.push(pipeline_id);
            leaves_out.push(first);
            leaves_out.extend(second);
        }

        let batch = PolicyObject {
            id: batch_id.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            policy_type_name: "batch".to_string(),
            attributes: PolicyAttributes::Batch {
                subpolicies: pipeline_ids,
            },
            visible: true,
            tags: self.tags.clone(),
            user_data: Some(r#"{"isSausage": true}"#.to_string()),
        };

        let mut policies = vec![batch];
        policies.extend(pipelines_out);
        policies.extend(leaves_out);

        PolicySet { batch_id, policies }
    }
}

fn new_policy_id() -> String {
    Uuid::new_v4().to_string()
}

fn leaf_object(leaf: &LeafPolicy) -> PolicyObject {
    PolicyObject {
        id: new_policy_id(),
        label: leaf.label().to_string(),
        description: leaf.description().to_string(),
        policy_type_name: leaf.policy_type_name().to_string(),
        attributes: leaf.attributes(),
        visible: false,
        tags: Vec::new(),
        user_data: None,
    }
}

// --- Wire shapes ---

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PolicyAttributes {
    Batch {
        subpolicies: Vec<String>,
    },
    Pipeline {
        first_subpolicy: String,
        second_subpolicy: Option<String>,
    },
    SingleVlan {
        vn_node_id: String,
        tag_type: TagType,
    },
    MultipleVlan {
        untagged_vn_node_id: Option<String>,
        tagged_vn_node_ids: Vec<String>,
    },
    LogicalLink {
        security_zone: String,
        interface_type: InterfaceType,
        vlan_id: Option<u16>,
        ipv4_addressing_type: Ipv4Addressing,
        ipv6_addressing_type: Ipv6Addressing,
    },
    StaticRoute {
        network: String,
        share_ip_endpoint: bool,
    },
}

impl PolicyAttributes {
    fn references(&self) -> Vec<&str> {
        match self {
            PolicyAttributes::Batch { subpolicies } => subpolicies.iter().map(String::as_str).collect(),
            PolicyAttributes::Pipeline {
                first_subpolicy,
                second_subpolicy,
            } => std::iter::once(first_subpolicy.as_str())
                .chain(second_subpolicy.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyObject {
    pub id: String,
    pub label: String,
    pub description: String,
    pub policy_type_name: String,
    pub attributes: PolicyAttributes,
    pub visible: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

/// Body of an `obj-policy-import` submission
#[derive(Debug, Clone, Serialize)]
pub struct PolicySet {
    #[serde(skip)]
    batch_id: String,
    policies: Vec<PolicyObject>,
}

impl PolicySet {
    /// Id of the root batch policy; this is what gets applied to interfaces
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn policies(&self) -> &[PolicyObject] {
        &self.policies
    }

    /// Subpolicy ids referenced by some node but not present in the set
    pub fn dangling_references(&self) -> Vec<String> {
        let ids: HashSet<&str> = self.policies.iter().map(|p| p.id.as_str()).collect();
        self.policies
            .iter()
            .flat_map(|p| p.attributes.references())
            .filter(|r| !ids.contains(r))
            .map(str::to_string)
            .collect()
    }
}

/// Body of an `obj-policy-batch-apply` submission
#[derive(Debug, Clone, Serialize)]
pub struct BatchApply {
    pub application_points: Vec<ApplicationPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPoint {
    pub id: String,
    pub policies: Vec<PolicyUse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyUse {
    pub policy: String,
    pub used: bool,
}

impl BatchApply {
    /// Attach (`used = true`) or detach a batch policy on interface nodes
    pub fn new<I, S>(batch_id: &str, interface_ids: I, used: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            application_points: interface_ids
                .into_iter()
                .map(|id| ApplicationPoint {
                    id: id.into(),
                    policies: vec![PolicyUse {
                        policy: batch_id.to_string(),
                        used,
                    }],
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_vlan_tree_shape() {
        let set = ConnectivityTemplate::single_vlan("vn101-tagged", "vn-node-1", TagType::VlanTagged).build();
        let doc = serde_json::to_value(&set).unwrap();
        let policies = doc["policies"].as_array().unwrap();
        assert_eq!(policies.len(), 3);

        let batch = &policies[0];
        let pipeline = &policies[1];
        let leaf = &policies[2];

        assert_eq!(batch["policy_type_name"], "batch");
        assert_eq!(batch["id"], set.batch_id());
        assert_eq!(batch["label"], "vn101-tagged");
        assert_eq!(batch["visible"], true);
        assert_eq!(batch["attributes"]["subpolicies"], json!([pipeline["id"]]));

        assert_eq!(pipeline["policy_type_name"], "pipeline");
        assert_eq!(pipeline["attributes"]["first_subpolicy"], leaf["id"]);
        assert_eq!(pipeline["attributes"]["second_subpolicy"], json!(null));

        assert_eq!(leaf["policy_type_name"], "AttachSingleVLAN");
        assert_eq!(leaf["attributes"], json!({"vn_node_id": "vn-node-1", "tag_type": "vlan_tagged"}));
        assert!(set.dangling_references().is_empty());
    }

    #[test]
    fn test_ids_are_fresh_per_build() {
        let ct = ConnectivityTemplate::single_vlan("x", "vn", TagType::Untagged);
        let a = ct.build();
        let b = ct.build();
        assert_ne!(a.batch_id(), b.batch_id());

        let ids: HashSet<&str> = a.policies().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_two_subpolicy_pipeline() {
        let set = ConnectivityTemplate::new("ip-and-route")
            .with_pipeline(
                LeafPolicy::LogicalLink {
                    security_zone: "sz1".to_string(),
                    interface_type: InterfaceType::Tagged,
                    vlan_id: Some(300),
                    ipv4: Ipv4Addressing::Numbered,
                    ipv6: Ipv6Addressing::LinkLocal,
                },
                Some(LeafPolicy::StaticRoute {
                    network: "10.9.0.0/16".to_string(),
                    share_ip_endpoint: false,
                }),
            )
            .build();

        assert_eq!(set.policies().len(), 4);
        let doc = serde_json::to_value(&set).unwrap();
        let pipeline = &doc["policies"][1];
        assert_eq!(pipeline["attributes"]["first_subpolicy"], doc["policies"][2]["id"]);
        assert_eq!(pipeline["attributes"]["second_subpolicy"], doc["policies"][3]["id"]);
        assert_eq!(
            doc["policies"][2]["attributes"],
            json!({
                "security_zone": "sz1",
                "interface_type": "tagged",
                "vlan_id": 300,
                "ipv4_addressing_type": "numbered",
                "ipv6_addressing_type": "link_local"
            })
        );
        assert_eq!(doc["policies"][3]["policy_type_name"], "AttachStaticRoute");
        assert!(set.dangling_references().is_empty());
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut set = ConnectivityTemplate::single_vlan("x", "vn", TagType::Untagged).build();
        set.policies.pop();
        assert_eq!(set.dangling_references().len(), 1);
    }

    #[test]
    fn test_batch_apply_shape() {
        let body = BatchApply::new("batch-1", ["if-1", "if-2"], true);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"application_points": [
                {"id": "if-1", "policies": [{"policy": "batch-1", "used": true}]},
                {"id": "if-2", "policies": [{"policy": "batch-1", "used": true}]}
            ]})
        );
    }

    #[test]
    fn test_ip_link_untagged_without_vlan() {
        let ct = ConnectivityTemplate::ip_link("ipl", "sz", None);
        match &ct.pipelines[0].first {
            LeafPolicy::LogicalLink { interface_type, vlan_id, .. } => {
                assert_eq!(*interface_type, InterfaceType::Untagged);
                assert_eq!(*vlan_id, None);
            }
            other => panic!("unexpected leaf {:?}", other),
        }
    }
}
