use serde::{Deserialize, Serialize};

use crate::payloads::TagType;

// --- Graph node records returned by the query engine ---
//
// Only the attributes this client reads are modeled; everything else the
// controller sends is ignored during deserialization.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintSummary {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub design: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub system_type: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceNode {
    pub id: String,
    #[serde(default)]
    pub if_name: Option<String>,
    #[serde(default)]
    pub if_type: Option<String>,
    #[serde(default)]
    pub po_control_protocol: Option<String>,
    #[serde(default)]
    pub ipv4_addr: Option<String>,
    #[serde(default)]
    pub vlan_id: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub group_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMapNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub device_profile_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetworkNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub vn_id: Option<String>,
    #[serde(default)]
    pub vn_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityZoneNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub vrf_name: Option<String>,
}

/// Endpoint-policy node (batch, pipeline or leaf policy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub policy_type_name: Option<String>,
    /// Serialized attribute blob; the controller returns it as a JSON string
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

impl PolicyNode {
    /// Tagging mode of a single-VLAN leaf. The attribute blob may come back
    /// as a JSON string or as an object; only its `tag_type` field counts.
    pub fn tag_type(&self) -> Option<TagType> {
        let decoded;
        let attributes = match self.attributes.as_ref()? {
            serde_json::Value::String(raw) => {
                decoded = serde_json::from_str::<serde_json::Value>(raw).ok()?;
                &decoded
            }
            other => other,
        };
        serde_json::from_value(attributes.get("tag_type")?.clone()).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagNode {
    pub id: String,
    pub label: String,
}

/// Cached identity of a fabric system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub id: String,
    pub label: String,
    pub interface_map_id: String,
    pub device_profile_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(attributes: serde_json::Value) -> PolicyNode {
        PolicyNode {
            id: "leaf".to_string(),
            label: None,
            policy_type_name: Some("AttachSingleVLAN".to_string()),
            attributes: Some(attributes),
        }
    }

    #[test]
    fn test_tag_type_from_string_blob() {
        let node = leaf(json!("{\"vn_node_id\": \"vn-node\", \"tag_type\": \"vlan_tagged\"}"));
        assert_eq!(node.tag_type(), Some(TagType::VlanTagged));
    }

    #[test]
    fn test_tag_type_ignores_other_fields() {
        let node = leaf(json!({"vn_node_id": "vlan_tagged-vn", "tag_type": "untagged"}));
        assert_eq!(node.tag_type(), Some(TagType::Untagged));

        let node = leaf(json!({"vn_node_id": "untagged-or-vlan_tagged"}));
        assert_eq!(node.tag_type(), None);
    }

    #[test]
    fn test_tag_type_unparseable_blob() {
        assert_eq!(leaf(json!("not json vlan_tagged")).tag_type(), None);
        assert_eq!(leaf(json!({"tag_type": "sometimes"})).tag_type(), None);
    }
}
