use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::models::{InterfaceNode, PolicyNode, SecurityZoneNode, VirtualNetworkNode};
use crate::outcome::Outcome;
use crate::payloads::{BatchApply, ConnectivityTemplate, PolicySet, SubinterfaceAddressing, TagType};
use crate::query::{node, EdgeKind, Match, NodeKind, Path, TieBreak};

use super::BlueprintHandle;

/// Partial update of a virtual network; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualNetworkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_vlan_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<Vec<Value>>,
}

impl<'s> BlueprintHandle<'s> {
    // --- Connectivity templates ---

    /// Batch ids of the single-VLAN templates attached to the virtual network
    /// with VNI `vni`, as `(tagged, untagged)`.
    ///
    /// Walks virtual_network <- leaf policy <- pipeline <- batch and sorts
    /// each hit by the leaf's tagging mode. The first hit of each kind wins.
    pub async fn single_vlan_ct_id(&self, vni: &str) -> (Option<String>, Option<String>) {
        let pattern = Match::new().path(
            Path::start(node(NodeKind::VirtualNetwork).name("vn").attr("vn_id", vni))
                .in_(EdgeKind::VnToAttach)
                .node(
                    node(NodeKind::EpEndpointPolicy)
                        .name("leaf")
                        .attr("policy_type_name", "AttachSingleVLAN"),
                )
                .in_(EdgeKind::EpFirstSubpolicy)
                .node(node(NodeKind::EpEndpointPolicy).name("pipeline"))
                .in_(EdgeKind::EpSubpolicy)
                .node(
                    node(NodeKind::EpEndpointPolicy)
                        .name("batch")
                        .attr("policy_type_name", "batch"),
                ),
        );

        let mut tagged = None;
        let mut untagged = None;
        for row in self.query_match(&pattern).await {
            let (Some(leaf), Some(batch)) = (row.decode::<PolicyNode>("leaf"), row.id("batch")) else {
                continue;
            };
            match leaf.tag_type() {
                Some(TagType::VlanTagged) => {
                    tagged.get_or_insert_with(|| batch.to_string());
                }
                Some(TagType::Untagged) => {
                    untagged.get_or_insert_with(|| batch.to_string());
                }
                None => {}
            }
        }

        tracing::debug!(blueprint = %self.label, vni, ?tagged, ?untagged, "Single-VLAN template lookup");
        (tagged, untagged)
    }

    /// Batch policy id of the template labelled `label`
    pub async fn ct_id_by_label(&self, label: &str) -> Option<String> {
        let pattern = Match::new().path(Path::start(
            node(NodeKind::EpEndpointPolicy)
                .name("batch")
                .attr("policy_type_name", "batch")
                .attr("label", label),
        ));
        let rows = self.query_match(&pattern).await;
        TieBreak::First
            .select(&rows)
            .and_then(|row| row.id("batch"))
            .map(str::to_string)
    }

    /// Submit a built policy tree. The whole set is accepted or rejected as
    /// one unit, so a tree with a dangling subpolicy reference is refused
    /// locally before anything is sent.
    pub async fn import_connectivity_template(&self, set: &PolicySet) -> Result<()> {
        let dangling = set.dangling_references();
        if !dangling.is_empty() {
            return Err(ClientError::Schema(format!(
                "policy set references missing subpolicies: {}",
                dangling.join(", ")
            )));
        }

        let resp = self.session.post(&self.path("/obj-policy-import"), set, &[]).await?;
        if !resp.is_success() {
            tracing::error!(
                blueprint = %self.label,
                batch = set.batch_id(),
                status = %resp.status,
                "Connectivity template import failed: {}",
                resp.body
            );
        } else {
            tracing::info!(blueprint = %self.label, batch = set.batch_id(), "Imported connectivity template");
        }
        resp.into_write_result().map(|_| ())
    }

    /// Batch id of the template labelled like `ct`, importing it first when
    /// no such template exists. The flag is true when an import happened.
    pub async fn ensure_connectivity_template(&self, ct: &ConnectivityTemplate) -> Result<(String, bool)> {
        if let Some(id) = self.ct_id_by_label(&ct.label).await {
            return Ok((id, false));
        }
        let set = ct.build();
        self.import_connectivity_template(&set).await?;
        Ok((set.batch_id().to_string(), true))
    }

    /// Attach a template to interfaces; unlike [`BlueprintHandle::batch_apply`]
    /// a rejection is returned as an error
    pub async fn apply_connectivity_template(&self, batch_id: &str, interface_ids: &[String]) -> Result<Option<Value>> {
        let body = BatchApply::new(batch_id, interface_ids.iter().cloned(), true);
        self.session
            .patch_checked(&self.path("/obj-policy-batch-apply"), &body, &[("async", "full")])
            .await
    }

    // --- Routing zones and virtual networks ---

    /// Id of the routing zone labelled `label`
    pub async fn security_zone_id(&self, label: &str) -> Result<String> {
        let doc = self.session.get(&self.path("/security-zones")).await?;
        let zones: Vec<SecurityZoneNode> = match doc.get("items") {
            Some(Value::Object(map)) => map
                .values()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };

        zones
            .into_iter()
            .find(|z| z.label == label || z.vrf_name.as_deref() == Some(label))
            .map(|z| z.id)
            .ok_or_else(|| ClientError::not_found("routing zone", label))
    }

    /// Virtual network whose label or VNI equals `label_or_vni`
    pub async fn virtual_network(&self, label_or_vni: &str) -> Option<VirtualNetworkNode> {
        let pattern = Match::new().path(Path::start(node(NodeKind::VirtualNetwork).name("vn")));
        self.query_match(&pattern)
            .await
            .iter()
            .filter_map(|row| row.decode::<VirtualNetworkNode>("vn"))
            .find(|vn| vn.label == label_or_vni || vn.vn_id.as_deref() == Some(label_or_vni))
    }

    pub async fn patch_virtual_network(&self, vn_id: &str, patch: &VirtualNetworkPatch) -> Option<Value> {
        self.session
            .patch_throttled(&self.path(&format!("/virtual-networks/{}", vn_id)), patch, &[])
            .await
    }

    /// Move a virtual network into another routing zone
    pub async fn relocate_virtual_network(&self, vn_label: &str, zone_label: &str) -> Outcome {
        let Some(vn) = self.virtual_network(vn_label).await else {
            return Outcome::failed(vn_label, ClientError::not_found("virtual network", vn_label));
        };
        let zone_id = match self.security_zone_id(zone_label).await {
            Ok(id) => id,
            Err(e) => return Outcome::failed(vn_label, e),
        };

        let path = self.path(&format!("/virtual-networks/{}", vn.id));
        let current = match self.session.get(&path).await {
            Ok(doc) => doc,
            Err(e) => return Outcome::failed(vn_label, e),
        };
        if current.get("security_zone_id").and_then(Value::as_str) == Some(zone_id.as_str()) {
            return Outcome::unchanged(vn_label, format!("already in routing zone {}", zone_label));
        }

        let patch = VirtualNetworkPatch {
            security_zone_id: Some(zone_id),
            ..Default::default()
        };
        match self.session.patch_checked(&path, &patch, &[]).await {
            Ok(detail) => {
                tracing::info!(blueprint = %self.label, vn = vn_label, zone = zone_label, "Relocated virtual network");
                Outcome::applied(vn_label, detail)
            }
            Err(e) => Outcome::failed(vn_label, e),
        }
    }

    pub async fn delete_virtual_network(&self, vn_id: &str) -> Result<()> {
        let resp = self
            .session
            .delete(&self.path(&format!("/virtual-networks/{}", vn_id)))
            .await?;
        if !resp.is_success() {
            tracing::error!(blueprint = %self.label, vn = vn_id, status = %resp.status, "Delete failed: {}", resp.body);
        }
        resp.into_write_result().map(|_| ())
    }

    // --- IP link addressing ---

    /// Switch-side and server-side subinterface ids created on
    /// `switch_intf_id` by an IP-link template
    pub async fn ip_link_subinterfaces(&self, switch_intf_id: &str, vlan_id: Option<u16>) -> Option<(String, String)> {
        let mut switch_sub = node(NodeKind::Interface)
            .name("switch_sub")
            .attr("if_type", "subinterface");
        if let Some(vlan) = vlan_id {
            switch_sub = switch_sub.attr("vlan_id", vlan);
        }

        let pattern = Match::new()
            .path(
                Path::start(node(NodeKind::Interface).attr("id", switch_intf_id))
                    .out(EdgeKind::ComposedOf)
                    .node(switch_sub)
                    .out(EdgeKind::Link)
                    .node(node(NodeKind::Link).name("link"))
                    .in_(EdgeKind::Link)
                    .node(
                        node(NodeKind::Interface)
                            .name("server_sub")
                            .attr("if_type", "subinterface"),
                    ),
            )
            .where_("lambda switch_sub, server_sub: switch_sub.id != server_sub.id");

        let rows = self.query_match(&pattern).await;
        let row = TieBreak::First.select(&rows)?;
        let switch_sub: InterfaceNode = row.decode("switch_sub")?;
        let server_sub: InterfaceNode = row.decode("server_sub")?;
        Some((switch_sub.id, server_sub.id))
    }

    pub async fn patch_subinterfaces(&self, addressing: &SubinterfaceAddressing) -> Result<Option<Value>> {
        self.session
            .patch_checked(&self.path("/subinterfaces"), addressing, &[])
            .await
    }
}
