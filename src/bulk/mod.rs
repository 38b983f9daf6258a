//! Bulk workflows driven by CSV input.
//!
//! Items run strictly in input order, one at a time. Each item yields one
//! [`Outcome`]; a failed item never stops the run.

mod input;

pub use input::{read_items, read_items_from_path, Workflow};

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::blueprint::{BlueprintHandle, GenericSystemRequest};
use crate::error::{ClientError, Result};
use crate::outcome::Outcome;
use crate::payloads::{ConnectivityTemplate, SubinterfaceAddressing, TagType};
use crate::session::Session;

/// One unit of bulk work, already validated
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItem {
    GenericSystem { blueprint: String, request: GenericSystemRequest },
    IpLink(IpLinkItem),
    VlanCt(VlanCtItem),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IpLinkItem {
    pub blueprint: String,
    pub routing_zone: String,
    pub system_label: String,
    pub switch_label: String,
    pub switch_if_name: String,
    pub vlan_id: Option<u16>,
    /// (switch side, server side) addresses in CIDR form
    pub addresses: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VlanCtItem {
    pub blueprint: String,
    pub ct_label: String,
    pub vn_label: String,
    pub tagged: bool,
}

impl BulkItem {
    pub fn blueprint(&self) -> &str {
        match self {
            BulkItem::GenericSystem { blueprint, .. } => blueprint,
            BulkItem::IpLink(item) => &item.blueprint,
            BulkItem::VlanCt(item) => &item.blueprint,
        }
    }

    pub fn label(&self) -> String {
        match self {
            BulkItem::GenericSystem { request, .. } => request.label.clone(),
            BulkItem::IpLink(item) => format!("{}:{}:{}", item.system_label, item.switch_label, item.switch_if_name),
            BulkItem::VlanCt(item) => item.ct_label.clone(),
        }
    }
}

struct BulkState<'s> {
    session: &'s Session,
    items: VecDeque<BulkItem>,
    handles: HashMap<String, BlueprintHandle<'s>>,
}

/// Run `items` lazily; each poll of the stream processes one item.
///
/// Blueprint handles are opened on first use and reused for later items of
/// the same blueprint, so their system caches carry across rows.
pub fn run_bulk<'s>(session: &'s Session, items: Vec<BulkItem>) -> impl Stream<Item = Outcome> + 's {
    let state = BulkState {
        session,
        items: items.into(),
        handles: HashMap::new(),
    };

    stream::unfold(state, |mut state| async move {
        let item = state.items.pop_front()?;
        let outcome = match handle_for(&mut state.handles, state.session, item.blueprint()).await {
            Ok(bp) => run_item(bp, &item).await,
            Err(e) => Outcome::failed(item.label(), e),
        };
        log_outcome(item.blueprint(), &outcome);
        Some((outcome, state))
    })
}

async fn handle_for<'a, 's>(
    handles: &'a mut HashMap<String, BlueprintHandle<'s>>,
    session: &'s Session,
    label: &str,
) -> Result<&'a BlueprintHandle<'s>> {
    if !handles.contains_key(label) {
        let handle = BlueprintHandle::open(session, label).await?;
        handles.insert(label.to_string(), handle);
    }
    handles
        .get(label)
        .ok_or_else(|| ClientError::not_found("blueprint", label))
}

async fn run_item(bp: &BlueprintHandle<'_>, item: &BulkItem) -> Outcome {
    match item {
        BulkItem::GenericSystem { request, .. } => bp.import_generic_system(request).await,
        BulkItem::IpLink(link) => import_ip_link(bp, link).await,
        BulkItem::VlanCt(ct) => import_vlan_ct(bp, ct).await,
    }
}

fn log_outcome(blueprint: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Applied { item, .. } => tracing::info!(blueprint, item = %item, "applied"),
        Outcome::Unchanged { item, reason } => tracing::info!(blueprint, item = %item, "unchanged: {}", reason),
        Outcome::Failed { item, error } => tracing::warn!(blueprint, item = %item, "failed: {}", error),
    }
}

/// Attach a numbered IP link template to one switch port of a generic
/// system, then address the subinterfaces it creates
async fn import_ip_link(bp: &BlueprintHandle<'_>, link: &IpLinkItem) -> Outcome {
    let item = format!("{}:{}:{}", link.system_label, link.switch_label, link.switch_if_name);

    let zone_id = match bp.security_zone_id(&link.routing_zone).await {
        Ok(id) => id,
        Err(e) => return Outcome::failed(item, e),
    };

    let target = bp
        .generic_system_links(&link.system_label)
        .await
        .into_iter()
        .find(|l| {
            l.switch.label == link.switch_label
                && l.switch_interface.if_name.as_deref() == Some(link.switch_if_name.as_str())
        });
    let Some(target) = target else {
        return Outcome::failed(
            item.clone(),
            ClientError::not_found("link", item),
        );
    };
    let interface_id = target
        .evpn_interface
        .map(|i| i.id)
        .unwrap_or(target.switch_interface.id);

    let ct_label = match link.vlan_id {
        Some(vlan) => format!("{}-vlan{}", link.routing_zone, vlan),
        None => format!("{}-untagged", link.routing_zone),
    };
    let ct = ConnectivityTemplate::ip_link(ct_label, zone_id, link.vlan_id);
    let batch_id = match bp.ensure_connectivity_template(&ct).await {
        Ok((id, _)) => id,
        Err(e) => return Outcome::failed(item, e),
    };

    let applied = match bp.apply_connectivity_template(&batch_id, &[interface_id.clone()]).await {
        Ok(detail) => detail,
        Err(e) => return Outcome::failed(item, e),
    };

    let Some((switch_cidr, server_cidr)) = &link.addresses else {
        return Outcome::applied(item, applied);
    };
    let Some((switch_sub, server_sub)) = bp.ip_link_subinterfaces(&interface_id, link.vlan_id).await else {
        return Outcome::failed(item.clone(), ClientError::not_found("subinterfaces of", item));
    };

    let addressing = SubinterfaceAddressing::new()
        .numbered(switch_sub, switch_cidr)
        .and_then(|a| a.numbered(server_sub, server_cidr));
    let addressing = match addressing {
        Ok(a) => a,
        Err(e) => return Outcome::failed(item, e),
    };
    match bp.patch_subinterfaces(&addressing).await {
        Ok(detail) => Outcome::applied(item, detail),
        Err(e) => Outcome::failed(item, e),
    }
}

/// Create a single-VLAN template for a virtual network unless one with the
/// same label exists
async fn import_vlan_ct(bp: &BlueprintHandle<'_>, ct: &VlanCtItem) -> Outcome {
    let Some(vn) = bp.virtual_network(&ct.vn_label).await else {
        return Outcome::failed(&ct.ct_label, ClientError::not_found("virtual network", &ct.vn_label));
    };
    if bp.ct_id_by_label(&ct.ct_label).await.is_some() {
        return Outcome::unchanged(&ct.ct_label, "template already exists");
    }

    let tag_type = if ct.tagged { TagType::VlanTagged } else { TagType::Untagged };
    let set = ConnectivityTemplate::single_vlan(&ct.ct_label, vn.id, tag_type).build();
    match bp.import_connectivity_template(&set).await {
        Ok(()) => Outcome::applied(&ct.ct_label, Some(serde_json::json!({"batch_id": set.batch_id()}))),
        Err(e) => Outcome::failed(&ct.ct_label, e),
    }
}

/// Outcome tallies of a finished bulk run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkCounts {
    pub applied: i32,
    pub unchanged: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSummary {
    pub message: String,
    pub result: BulkCounts,
}

impl BulkCounts {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied { .. } => self.applied += 1,
            Outcome::Unchanged { .. } => self.unchanged += 1,
            Outcome::Failed { item, error } => self.errors.push(format!("{}: {}", item, error)),
        }
    }
}

impl BulkSummary {
    /// Drain a bulk stream to completion
    pub async fn collect<S>(outcomes: S) -> Self
    where
        S: Stream<Item = Outcome>,
    {
        let counts = outcomes
            .fold(BulkCounts::default(), |mut counts, outcome| async move {
                counts.record(&outcome);
                counts
            })
            .await;

        BulkSummary {
            message: format!(
                "Processed {} items ({} applied, {} unchanged, {} failed)",
                counts.applied as usize + counts.unchanged as usize + counts.errors.len(),
                counts.applied,
                counts.unchanged,
                counts.errors.len()
            ),
            result: counts,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.result.errors.is_empty()
    }
}
