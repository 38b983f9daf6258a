//! CSV ingestion for the bulk workflows.
//!
//! Every workflow has a fixed, order-sensitive header row. The header and
//! every row are validated up front so a malformed file fails with
//! `ClientError::Schema` before a single remote call is made.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use super::{BulkItem, IpLinkItem, VlanCtItem};
use crate::blueprint::{GenericSystemRequest, LinkRequest};
use crate::error::{ClientError, Result};
use crate::models::Speed;
use crate::payloads::addressing::validate_cidr;
use crate::payloads::LagMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    GenericSystems,
    IpLinks,
    VlanCts,
}

const GENERIC_SYSTEM_HEADERS: &[&str] = &[
    "blueprint",
    "system_label",
    "speed",
    "lag_mode",
    "gs_tags",
    "label1",
    "ifname1",
    "label2",
    "ifname2",
];

const IP_LINK_HEADERS: &[&str] = &[
    "blueprint",
    "routing_zone",
    "system_label",
    "switch_label",
    "switch_ifname",
    "vlan_id",
    "ipv4_switch",
    "ipv4_server",
];

const VLAN_CT_HEADERS: &[&str] = &["blueprint", "ct_label", "vn_label", "tagged"];

impl Workflow {
    pub fn expected_headers(&self) -> &'static [&'static str] {
        match self {
            Workflow::GenericSystems => GENERIC_SYSTEM_HEADERS,
            Workflow::IpLinks => IP_LINK_HEADERS,
            Workflow::VlanCts => VLAN_CT_HEADERS,
        }
    }

    /// Exact, ordered comparison; surrounding whitespace is ignored
    pub fn check_headers(&self, headers: &csv::StringRecord) -> Result<()> {
        let expected = self.expected_headers();
        let found: Vec<&str> = headers.iter().map(str::trim).collect();
        if found != expected {
            return Err(ClientError::Schema(format!(
                "expected header '{}', found '{}'",
                expected.join(","),
                found.join(",")
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GenericSystemRow {
    blueprint: String,
    system_label: String,
    speed: String,
    lag_mode: Option<String>,
    gs_tags: Option<String>,
    label1: String,
    ifname1: String,
    label2: Option<String>,
    ifname2: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpLinkRow {
    blueprint: String,
    routing_zone: String,
    system_label: String,
    switch_label: String,
    switch_ifname: String,
    vlan_id: Option<u16>,
    ipv4_switch: Option<String>,
    ipv4_server: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VlanCtRow {
    blueprint: String,
    ct_label: String,
    vn_label: String,
    tagged: String,
}

pub fn read_items_from_path(workflow: Workflow, path: &Path) -> Result<Vec<BulkItem>> {
    let file = std::fs::File::open(path)?;
    read_items(workflow, file)
}

/// Parse a whole CSV document into bulk items, or fail without side effects
pub fn read_items<R: Read>(workflow: Workflow, input: R) -> Result<Vec<BulkItem>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    workflow.check_headers(reader.headers()?)?;

    match workflow {
        Workflow::GenericSystems => {
            let mut rows = Vec::new();
            for row in reader.deserialize::<GenericSystemRow>() {
                rows.push(row.map_err(malformed)?);
            }
            aggregate_generic_systems(rows)
        }
        Workflow::IpLinks => {
            let mut items = Vec::new();
            for row in reader.deserialize::<IpLinkRow>() {
                items.push(BulkItem::IpLink(ip_link_item(row.map_err(malformed)?)?));
            }
            Ok(items)
        }
        Workflow::VlanCts => {
            let mut items = Vec::new();
            for row in reader.deserialize::<VlanCtRow>() {
                let row = row.map_err(malformed)?;
                items.push(BulkItem::VlanCt(VlanCtItem {
                    tagged: parse_tagged(&row.tagged)?,
                    blueprint: row.blueprint,
                    ct_label: row.ct_label,
                    vn_label: row.vn_label,
                }));
            }
            Ok(items)
        }
    }
}

/// Rows sharing (blueprint, system_label) become one generic system whose
/// links are listed in row order
fn aggregate_generic_systems(rows: Vec<GenericSystemRow>) -> Result<Vec<BulkItem>> {
    let mut systems: Vec<(String, GenericSystemRequest)> = Vec::new();

    for row in rows {
        if row.system_label.is_empty() || row.label1.is_empty() || row.ifname1.is_empty() {
            return Err(ClientError::Schema(format!(
                "generic system row for '{}' lacks system_label, label1 or ifname1",
                row.blueprint
            )));
        }
        let speed: Speed = row.speed.parse()?;
        let lag_mode = row.lag_mode.as_deref().map(str::parse::<LagMode>).transpose()?;

        let mut links = vec![LinkRequest {
            switch_label: row.label1,
            switch_if_name: row.ifname1,
            speed,
        }];
        match (row.label2, row.ifname2) {
            (Some(label), Some(if_name)) => links.push(LinkRequest {
                switch_label: label,
                switch_if_name: if_name,
                speed,
            }),
            (None, None) => {}
            _ => {
                return Err(ClientError::Schema(format!(
                    "'{}': label2 and ifname2 must be given together",
                    row.system_label
                )))
            }
        }

        let existing = systems
            .iter_mut()
            .find(|(bp, req)| *bp == row.blueprint && req.label == row.system_label);
        match existing {
            Some((_, request)) => {
                match (request.lag_mode, lag_mode) {
                    (Some(have), Some(want)) if have != want => {
                        return Err(ClientError::Schema(format!(
                            "'{}': conflicting lag_mode values {:?} and {:?}",
                            request.label, have, want
                        )))
                    }
                    (None, Some(want)) => request.lag_mode = Some(want),
                    _ => {}
                }
                request.links.extend(links);
                for tag in split_tags(row.gs_tags.as_deref()) {
                    if !request.tags.contains(&tag) {
                        request.tags.push(tag);
                    }
                }
            }
            None => systems.push((
                row.blueprint,
                GenericSystemRequest {
                    label: row.system_label,
                    hostname: None,
                    lag_mode,
                    tags: split_tags(row.gs_tags.as_deref()),
                    links,
                },
            )),
        }
    }

    Ok(systems
        .into_iter()
        .map(|(blueprint, request)| BulkItem::GenericSystem { blueprint, request })
        .collect())
}

fn ip_link_item(row: IpLinkRow) -> Result<IpLinkItem> {
    let addresses = match (row.ipv4_switch, row.ipv4_server) {
        (Some(switch), Some(server)) => Some((validate_cidr(&switch)?, validate_cidr(&server)?)),
        (None, None) => None,
        _ => {
            return Err(ClientError::Schema(format!(
                "'{}:{}': ipv4_switch and ipv4_server must be given together",
                row.switch_label, row.switch_ifname
            )))
        }
    };
    Ok(IpLinkItem {
        blueprint: row.blueprint,
        routing_zone: row.routing_zone,
        system_label: row.system_label,
        switch_label: row.switch_label,
        switch_if_name: row.switch_ifname,
        vlan_id: row.vlan_id,
        addresses,
    })
}

fn malformed(e: csv::Error) -> ClientError {
    ClientError::Schema(format!("malformed row: {}", e))
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.unwrap_or_default().split([',', ';']).map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn parse_tagged(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "tagged" | "vlan_tagged" => Ok(true),
        "false" | "no" | "0" | "untagged" => Ok(false),
        other => Err(ClientError::Schema(format!("'{}' is not a tagging mode", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GS_HEADER: &str = "blueprint,system_label,speed,lag_mode,gs_tags,label1,ifname1,label2,ifname2";

    #[test]
    fn test_header_exact_match() {
        let doc = format!("{}\ndc1,gs1,10G,,,leaf1,et-0/0/1,,\n", GS_HEADER);
        let items = read_items(Workflow::GenericSystems, doc.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_header_permutations_rejected() {
        for workflow in [Workflow::GenericSystems, Workflow::IpLinks, Workflow::VlanCts] {
            let base = workflow.expected_headers().to_vec();

            let mut missing = base.clone();
            missing.remove(1);
            let mut extra = base.clone();
            extra.push("comment");
            let mut swapped = base.clone();
            swapped.swap(1, 2);
            let mut reversed = base.clone();
            reversed.reverse();
            let mut renamed = base.clone();
            renamed[0] = "blueprint_label";

            for header in [missing, extra, swapped, reversed, renamed] {
                let doc = format!("{}\n", header.join(","));
                let err = read_items(workflow, doc.as_bytes()).unwrap_err();
                assert!(
                    matches!(err, ClientError::Schema(_)),
                    "{:?} accepted {:?}",
                    workflow,
                    header
                );
            }

            let exact = format!("{}\n", base.join(","));
            assert!(read_items(workflow, exact.as_bytes()).unwrap().is_empty());
        }
    }

    #[test]
    fn test_each_workflow_checks_its_own_header() {
        let doc = "blueprint,ct_label,vn_label,tagged\n";
        assert!(read_items(Workflow::VlanCts, doc.as_bytes()).unwrap().is_empty());
        assert!(matches!(
            read_items(Workflow::IpLinks, doc.as_bytes()),
            Err(ClientError::Schema(_))
        ));
    }

    #[test]
    fn test_generic_systems_aggregate_by_label() {
        let doc = format!(
            "{}\n\
             dc1,gs1,10G,lacp_active,\"prod,db\",leaf1,et-0/0/1,leaf2,et-0/0/1\n\
             dc1,gs2,25G,,,leaf1,et-0/0/2,,\n\
             dc1,gs1,10G,,db;web,leaf1,et-0/0/3,,\n\
             dc2,gs1,10G,,,leaf9,et-0/0/1,,\n",
            GS_HEADER
        );
        let items = read_items(Workflow::GenericSystems, doc.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);

        let BulkItem::GenericSystem { blueprint, request } = &items[0] else {
            panic!("expected generic system");
        };
        assert_eq!(blueprint, "dc1");
        assert_eq!(request.label, "gs1");
        assert_eq!(request.lag_mode, Some(LagMode::LacpActive));
        assert_eq!(request.tags, vec!["prod", "db", "web"]);
        let ports: Vec<(&str, &str)> = request
            .links
            .iter()
            .map(|l| (l.switch_label.as_str(), l.switch_if_name.as_str()))
            .collect();
        assert_eq!(
            ports,
            vec![("leaf1", "et-0/0/1"), ("leaf2", "et-0/0/1"), ("leaf1", "et-0/0/3")]
        );

        assert!(matches!(&items[2], BulkItem::GenericSystem { blueprint, .. } if blueprint == "dc2"));
    }

    #[test]
    fn test_conflicting_lag_mode_rejected() {
        let doc = format!(
            "{}\n\
             dc1,gs1,10G,lacp_active,,leaf1,et-0/0/1,,\n\
             dc1,gs1,10G,lacp_passive,,leaf2,et-0/0/1,,\n",
            GS_HEADER
        );
        assert!(matches!(
            read_items(Workflow::GenericSystems, doc.as_bytes()),
            Err(ClientError::Schema(_))
        ));

        let repeated = format!(
            "{}\n\
             dc1,gs1,10G,,,leaf1,et-0/0/1,,\n\
             dc1,gs1,10G,lacp_passive,,leaf2,et-0/0/1,,\n\
             dc1,gs1,10G,lacp_passive,,leaf3,et-0/0/1,,\n",
            GS_HEADER
        );
        let items = read_items(Workflow::GenericSystems, repeated.as_bytes()).unwrap();
        let BulkItem::GenericSystem { request, .. } = &items[0] else {
            panic!("expected generic system");
        };
        assert_eq!(request.lag_mode, Some(LagMode::LacpPassive));
        assert_eq!(request.links.len(), 3);
    }

    #[test]
    fn test_bad_speed_is_schema_error() {
        let doc = format!("{}\ndc1,gs1,fast,,,leaf1,et-0/0/1,,\n", GS_HEADER);
        assert!(matches!(
            read_items(Workflow::GenericSystems, doc.as_bytes()),
            Err(ClientError::Schema(_))
        ));
    }

    #[test]
    fn test_half_second_link_rejected() {
        let doc = format!("{}\ndc1,gs1,10G,,,leaf1,et-0/0/1,leaf2,\n", GS_HEADER);
        assert!(read_items(Workflow::GenericSystems, doc.as_bytes()).is_err());
    }

    #[test]
    fn test_ip_link_rows() {
        let doc = "blueprint,routing_zone,system_label,switch_label,switch_ifname,vlan_id,ipv4_switch,ipv4_server\n\
                   dc1,blue,fw1,leaf1,et-0/0/5,101,10.1.0.0/31,10.1.0.1/31\n\
                   dc1,blue,fw2,leaf1,et-0/0/6,,,\n";
        let items = read_items(Workflow::IpLinks, doc.as_bytes()).unwrap();
        let BulkItem::IpLink(first) = &items[0] else {
            panic!("expected ip link");
        };
        assert_eq!(first.vlan_id, Some(101));
        assert_eq!(
            first.addresses,
            Some(("10.1.0.0/31".to_string(), "10.1.0.1/31".to_string()))
        );
        let BulkItem::IpLink(second) = &items[1] else {
            panic!("expected ip link");
        };
        assert_eq!(second.vlan_id, None);
        assert_eq!(second.addresses, None);
    }

    #[test]
    fn test_ip_link_bad_address() {
        let doc = "blueprint,routing_zone,system_label,switch_label,switch_ifname,vlan_id,ipv4_switch,ipv4_server\n\
                   dc1,blue,fw1,leaf1,et-0/0/5,101,10.1.0.0,10.1.0.1/31\n";
        assert!(matches!(
            read_items(Workflow::IpLinks, doc.as_bytes()),
            Err(ClientError::Schema(_))
        ));
    }

    #[test]
    fn test_vlan_ct_tagged_values() {
        let doc = "blueprint,ct_label,vn_label,tagged\n\
                   dc1,vn100-t,vn100,yes\n\
                   dc1,vn100-u,vn100,untagged\n";
        let items = read_items(Workflow::VlanCts, doc.as_bytes()).unwrap();
        let tagged: Vec<bool> = items
            .iter()
            .filter_map(|i| match i {
                BulkItem::VlanCt(ct) => Some(ct.tagged),
                _ => None,
            })
            .collect();
        assert_eq!(tagged, vec![true, false]);

        let bad = "blueprint,ct_label,vn_label,tagged\ndc1,x,vn100,maybe\n";
        assert!(read_items(Workflow::VlanCts, bad.as_bytes()).is_err());
    }
}
