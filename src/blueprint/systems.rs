use std::collections::HashMap;

use crate::error::{ClientError, Result};
use crate::models::{InterfaceMapNode, InterfaceNode, LinkNode, Speed, SystemInfo, SystemNode};
use crate::outcome::Outcome;
use crate::payloads::{build_generic_system, build_link_labels, GenericSystemSpec, LagEntry, LagMode, LinkMember, ResolvedLink};
use crate::query::{is_in, named, node, EdgeKind, Match, NodeKind, Path, TieBreak};

use super::BlueprintHandle;

/// One requested link of a new generic system, by switch label
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRequest {
    pub switch_label: String,
    pub switch_if_name: String,
    pub speed: Speed,
}

/// A generic system to create, before ids are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct GenericSystemRequest {
    pub label: String,
    pub hostname: Option<String>,
    pub lag_mode: Option<LagMode>,
    pub tags: Vec<String>,
    pub links: Vec<LinkRequest>,
}

/// Path from a generic system to the switch port at the far end of a link
#[derive(Debug, Clone)]
pub struct GenericSystemLink {
    pub gs_interface: InterfaceNode,
    pub link: LinkNode,
    pub switch_interface: InterfaceNode,
    pub switch: SystemNode,
    /// EVPN-controlled port-channel the switch port belongs to, when bonded
    pub evpn_interface: Option<InterfaceNode>,
    pub tags: Vec<String>,
}

impl<'s> BlueprintHandle<'s> {
    /// Identity, interface map and device profile of a system by label.
    /// Cached for the handle lifetime after the first successful lookup.
    pub async fn system(&self, label: &str) -> Result<SystemInfo> {
        self.systems
            .get_or_try_populate(label.to_string(), || self.fetch_system(label))
            .await
    }

    async fn fetch_system(&self, label: &str) -> Result<SystemInfo> {
        let pattern = Match::new().path(
            Path::start(node(NodeKind::System).name("system").attr("label", label))
                .out(EdgeKind::InterfaceMap)
                .node(node(NodeKind::InterfaceMap).name("interface_map")),
        );
        let rows = self.query_match(&pattern).await;
        let row = TieBreak::First
            .select(&rows)
            .ok_or_else(|| ClientError::not_found("system", label))?;

        let system: SystemNode = row
            .decode("system")
            .ok_or_else(|| ClientError::not_found("system", label))?;
        let interface_map: InterfaceMapNode = row
            .decode("interface_map")
            .ok_or_else(|| ClientError::not_found("interface map of system", label))?;

        self.labels.insert(system.id.clone(), label.to_string()).await;
        tracing::debug!(blueprint = %self.label, system = label, id = %system.id, "Cached system lookup");

        Ok(SystemInfo {
            id: system.id,
            label: label.to_string(),
            interface_map_id: interface_map.id,
            device_profile_id: interface_map.device_profile_id,
        })
    }

    /// Label of a system node by id
    pub async fn system_label(&self, id: &str) -> Result<String> {
        self.labels
            .get_or_try_populate(id.to_string(), || async {
                let pattern = Match::new().path(Path::start(node(NodeKind::System).name("system").attr("id", id)));
                let rows = self.query_match(&pattern).await;
                TieBreak::First
                    .select(&rows)
                    .and_then(|row| row.attr_str("system", "label").map(str::to_string))
                    .ok_or_else(|| ClientError::not_found("system id", id))
            })
            .await
    }

    /// Whether any system in the blueprint carries `label`
    pub async fn system_exists(&self, label: &str) -> bool {
        let pattern = Match::new().path(Path::start(node(NodeKind::System).name("system").attr("label", label)));
        !self.query_match(&pattern).await.is_empty()
    }

    /// Transformation on `switch_label`'s device profile that exposes
    /// `if_name` at exactly `speed` (e.g. `10G`)
    pub async fn transformation_id(&self, switch_label: &str, if_name: &str, speed: &str) -> Result<Option<u32>> {
        let speed: Speed = speed.parse()?;
        let system = self.system(switch_label).await?;
        let profile = self.session.device_profile(&system.device_profile_id).await?;
        Ok(profile.transformation_id(if_name, speed))
    }

    /// Every link between the generic system `gs_label` and a switch, one
    /// entry per link with its tags folded in
    pub async fn generic_system_links(&self, gs_label: &str) -> Vec<GenericSystemLink> {
        let pattern = Match::new()
            .path(
                Path::start(node(NodeKind::System).name("generic").attr("label", gs_label).attr("system_type", "server"))
                    .out(EdgeKind::HostedInterfaces)
                    .node(node(NodeKind::Interface).name("gs_intf"))
                    .out(EdgeKind::Link)
                    .node(node(NodeKind::Link).name("link"))
                    .in_(EdgeKind::Link)
                    .node(node(NodeKind::Interface).name("switch_intf"))
                    .in_(EdgeKind::HostedInterfaces)
                    .node(node(NodeKind::System).name("switch").attr("role", is_in(["leaf", "access"]))),
            )
            .optional(
                Path::start(named("switch_intf"))
                    .in_(EdgeKind::ComposedOf)
                    .node(node(NodeKind::Interface).attr("if_type", "port_channel"))
                    .in_(EdgeKind::ComposedOf)
                    .node(node(NodeKind::Interface).name("evpn").attr("po_control_protocol", "evpn")),
            )
            .optional(
                Path::start(node(NodeKind::Tag).name("tag"))
                    .out(EdgeKind::Tag)
                    .node(named("link")),
            )
            .where_("lambda gs_intf, switch_intf: gs_intf.id != switch_intf.id");

        let rows = self.query_match(&pattern).await;
        let mut links: Vec<GenericSystemLink> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in &rows {
            let (Some(gs_interface), Some(link), Some(switch_interface), Some(switch)) = (
                row.decode::<InterfaceNode>("gs_intf"),
                row.decode::<LinkNode>("link"),
                row.decode::<InterfaceNode>("switch_intf"),
                row.decode::<SystemNode>("switch"),
            ) else {
                tracing::warn!(blueprint = %self.label, system = gs_label, "Skipping incomplete link row");
                continue;
            };
            let tag = row.attr_str("tag", "label").map(str::to_string);

            match index.get(&link.id) {
                Some(&i) => {
                    if let Some(tag) = tag {
                        if !links[i].tags.contains(&tag) {
                            links[i].tags.push(tag);
                        }
                    }
                }
                None => {
                    index.insert(link.id.clone(), links.len());
                    links.push(GenericSystemLink {
                        gs_interface,
                        link,
                        switch_interface,
                        switch,
                        evpn_interface: row.decode("evpn"),
                        tags: tag.into_iter().collect(),
                    });
                }
            }
        }

        links
    }

    /// A single switch-side link of `gs_label`, chosen by `tie_break` when
    /// the system has more than one
    pub async fn switch_interface(&self, gs_label: &str, tie_break: TieBreak) -> Option<GenericSystemLink> {
        let mut links = self.generic_system_links(gs_label).await;
        match tie_break {
            TieBreak::First if !links.is_empty() => Some(links.remove(0)),
            TieBreak::Unique if links.len() == 1 => links.pop(),
            _ => {
                if links.len() > 1 {
                    tracing::warn!(system = gs_label, links = links.len(), "Generic system has several links");
                }
                None
            }
        }
    }

    /// Resolve switch labels and port speeds into a creation body
    pub async fn resolve_generic_system(&self, request: &GenericSystemRequest) -> Result<GenericSystemSpec> {
        if request.links.is_empty() {
            return Err(ClientError::Schema(format!("generic system '{}' has no links", request.label)));
        }

        let mut resolved = Vec::with_capacity(request.links.len());
        for link in &request.links {
            let switch = self.system(&link.switch_label).await?;
            let profile = self.session.device_profile(&switch.device_profile_id).await?;
            let transformation_id = profile
                .transformation_id(&link.switch_if_name, link.speed)
                .ok_or_else(|| {
                    ClientError::not_found(
                        "transformation",
                        format!("{}:{}@{}", link.switch_label, link.switch_if_name, link.speed),
                    )
                })?;
            resolved.push(ResolvedLink {
                switch_system_id: switch.id,
                transformation_id,
                switch_if_name: link.switch_if_name.clone(),
                speed: link.speed,
            });
        }

        Ok(build_generic_system(
            &request.label,
            request.hostname.as_deref(),
            &resolved,
            request.lag_mode,
            &request.tags,
        ))
    }

    /// Create a generic system unless one with the same label exists.
    /// Rejections by the controller come back as `Outcome::Failed`.
    pub async fn create_generic_system(&self, spec: &GenericSystemSpec) -> Outcome {
        let label = spec
            .new_systems
            .first()
            .map(|s| s.label.clone())
            .unwrap_or_default();

        if self.system_exists(&label).await {
            tracing::info!(blueprint = %self.label, system = %label, "Generic system already present");
            return Outcome::unchanged(label, "system already exists");
        }

        match self.session.post(&self.path("/switch-system-links"), spec, &[]).await {
            Ok(resp) if resp.is_success() => {
                tracing::info!(blueprint = %self.label, system = %label, "Created generic system");
                Outcome::applied(label, resp.json())
            }
            Ok(resp) => {
                tracing::error!(
                    blueprint = %self.label,
                    system = %label,
                    status = %resp.status,
                    "Generic system creation rejected: {}",
                    resp.body
                );
                Outcome::failed(label, ClientError::Write { status: resp.status, body: resp.body })
            }
            Err(e) => {
                tracing::error!(blueprint = %self.label, system = %label, "Generic system creation failed: {}", e);
                Outcome::failed(label, e)
            }
        }
    }

    /// Resolve and create in one step, skipping lookups when the system
    /// already exists
    pub async fn import_generic_system(&self, request: &GenericSystemRequest) -> Outcome {
        if self.system_exists(&request.label).await {
            return Outcome::unchanged(&request.label, "system already exists");
        }
        match self.resolve_generic_system(request).await {
            Ok(spec) => self.create_generic_system(&spec).await,
            Err(e) => {
                tracing::warn!(blueprint = %self.label, system = %request.label, "Cannot resolve generic system: {}", e);
                Outcome::failed(&request.label, e)
            }
        }
    }

    /// Bundle each listed generic system's links into one LAG, labelled
    /// `link1`, `link2`, ... in list order
    pub async fn assign_lacp(&self, gs_labels: &[&str], lag_mode: LagMode) -> Outcome {
        let item = gs_labels.join(",");
        let mut entries = Vec::new();

        for label in gs_labels {
            let links = self.generic_system_links(label).await;
            if links.is_empty() {
                return Outcome::failed(item, ClientError::not_found("generic system links", *label));
            }
            entries.push(LagEntry {
                members: links
                    .into_iter()
                    .map(|l| LinkMember {
                        link_id: l.link.id,
                        switch_if_name: l.switch_interface.if_name.unwrap_or_default(),
                    })
                    .collect(),
            });
        }

        let labels = build_link_labels(&entries, lag_mode);
        if labels.is_empty() {
            return Outcome::unchanged(item, "no physical members to bundle");
        }

        match self.session.patch_checked(&self.path("/leaf-server-link-labels"), &labels, &[]).await {
            Ok(detail) => Outcome::applied(item, detail),
            Err(e) => Outcome::failed(item, e),
        }
    }
}
