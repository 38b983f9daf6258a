use serde::{Deserialize, Serialize};

use crate::models::Speed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagMode {
    LacpActive,
    LacpPassive,
    StaticLag,
}

impl std::str::FromStr for LagMode {
    type Err = crate::error::ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lacp_active" => Ok(LagMode::LacpActive),
            "lacp_passive" => Ok(LagMode::LacpPassive),
            "static_lag" => Ok(LagMode::StaticLag),
            other => Err(crate::error::ClientError::Schema(format!("unknown lag mode '{}'", other))),
        }
    }
}

/// Link of a generic system once switch label and port speed are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub switch_system_id: String,
    pub transformation_id: u32,
    pub switch_if_name: String,
    pub speed: Speed,
}

// --- Wire shapes for switch-system-links ---

#[derive(Debug, Clone, Serialize)]
pub struct GenericSystemSpec {
    pub links: Vec<SwitchSystemLink>,
    pub new_systems: Vec<NewSystem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchSystemLink {
    pub lag_mode: Option<LagMode>,
    pub system: SystemRef,
    pub switch: SwitchEndpoint,
}

/// `system_id: null` refers to the system declared in `new_systems`
#[derive(Debug, Clone, Serialize)]
pub struct SystemRef {
    pub system_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchEndpoint {
    pub system_id: String,
    pub transformation_id: u32,
    pub if_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSystem {
    pub system_type: String,
    pub label: String,
    pub hostname: String,
    pub port_channel_id_min: u32,
    pub port_channel_id_max: u32,
    pub logical_device: LogicalDeviceSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalDeviceSpec {
    pub id: String,
    pub display_name: String,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub panel_layout: PanelLayout,
    pub port_indexing: PortIndexing,
    pub port_groups: Vec<PortGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelLayout {
    pub row_count: u32,
    pub column_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortIndexing {
    pub order: String,
    pub start_index: u32,
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortGroup {
    pub count: u32,
    pub speed: Speed,
    pub roles: Vec<String>,
}

impl LogicalDeviceSpec {
    pub fn port_count(&self) -> u32 {
        self.panels
            .iter()
            .flat_map(|p| p.port_groups.iter())
            .map(|g| g.count)
            .sum()
    }
}

/// Tally link speeds in first-seen order
pub fn tally_speeds<I>(speeds: I) -> Vec<(Speed, u32)>
where
    I: IntoIterator<Item = Speed>,
{
    let mut tally: Vec<(Speed, u32)> = Vec::new();
    for speed in speeds {
        match tally.iter_mut().find(|(s, _)| *s == speed) {
            Some((_, count)) => *count += 1,
            None => tally.push((speed, 1)),
        }
    }
    tally
}

/// Synthesize a one-panel logical device with one port group per distinct
/// speed. The total port count equals the number of speeds given.
pub fn derive_logical_device<I>(speeds: I) -> LogicalDeviceSpec
where
    I: IntoIterator<Item = Speed>,
{
    let tally = tally_speeds(speeds);
    let total: u32 = tally.iter().map(|(_, c)| c).sum();

    let tokens: Vec<String> = tally.iter().map(|(speed, count)| format!("{}x{}", count, speed)).collect();
    let display_name = format!("auto-{}", tokens.join("-"));

    let port_groups = tally
        .into_iter()
        .map(|(speed, count)| PortGroup {
            count,
            speed,
            roles: vec!["leaf".to_string(), "access".to_string()],
        })
        .collect();

    LogicalDeviceSpec {
        id: display_name.clone(),
        display_name,
        panels: vec![Panel {
            panel_layout: PanelLayout {
                row_count: 1,
                column_count: total,
            },
            port_indexing: PortIndexing {
                order: "T-B, L-R".to_string(),
                start_index: 1,
                schema: "absolute".to_string(),
            },
            port_groups,
        }],
    }
}

/// Compose the switch-system-links body for one new generic system
pub fn build_generic_system(
    label: &str,
    hostname: Option<&str>,
    links: &[ResolvedLink],
    lag_mode: Option<LagMode>,
    tags: &[String],
) -> GenericSystemSpec {
    let logical_device = derive_logical_device(links.iter().map(|l| l.speed));

    GenericSystemSpec {
        links: links
            .iter()
            .map(|link| SwitchSystemLink {
                lag_mode,
                system: SystemRef { system_id: None },
                switch: SwitchEndpoint {
                    system_id: link.switch_system_id.clone(),
                    transformation_id: link.transformation_id,
                    if_name: link.switch_if_name.clone(),
                },
            })
            .collect(),
        new_systems: vec![NewSystem {
            system_type: "server".to_string(),
            label: label.to_string(),
            hostname: hostname.unwrap_or(label).to_string(),
            port_channel_id_min: 0,
            port_channel_id_max: 0,
            logical_device,
            tags: tags.to_vec(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpeedUnit;
    use serde_json::json;

    fn speed(s: &str) -> Speed {
        s.parse().unwrap()
    }

    #[test]
    fn test_logical_device_from_speed_counts() {
        let speeds = ["10G", "10G", "25G", "10G", "25G", "10G"].map(speed);
        let ld = derive_logical_device(speeds);

        let groups = &ld.panels[0].port_groups;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 4);
        assert_eq!(groups[0].speed, Speed::new(10, SpeedUnit::G));
        assert_eq!(groups[1].count, 2);
        assert_eq!(groups[1].speed, Speed::new(25, SpeedUnit::G));
        assert_eq!(ld.port_count(), 6);
        assert_eq!(ld.panels[0].panel_layout.column_count, 6);
        assert_eq!(ld.display_name, "auto-4x10G-2x25G");
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let ld = derive_logical_device(["100G", "1G", "100G"].map(speed));
        assert_eq!(ld.display_name, "auto-2x100G-1x1G");
    }

    #[test]
    fn test_generic_system_body() {
        let links = vec![
            ResolvedLink {
                switch_system_id: "sw-a".to_string(),
                transformation_id: 3,
                switch_if_name: "et-0/0/1".to_string(),
                speed: speed("10G"),
            },
            ResolvedLink {
                switch_system_id: "sw-b".to_string(),
                transformation_id: 3,
                switch_if_name: "et-0/0/1".to_string(),
                speed: speed("10G"),
            },
        ];
        let spec = build_generic_system("gs1", None, &links, Some(LagMode::LacpActive), &["db".to_string()]);
        let doc = serde_json::to_value(&spec).unwrap();

        assert_eq!(doc["links"].as_array().unwrap().len(), 2);
        assert_eq!(
            doc["links"][1],
            json!({
                "lag_mode": "lacp_active",
                "system": {"system_id": null},
                "switch": {"system_id": "sw-b", "transformation_id": 3, "if_name": "et-0/0/1"}
            })
        );
        let new_system = &doc["new_systems"][0];
        assert_eq!(new_system["label"], "gs1");
        assert_eq!(new_system["hostname"], "gs1");
        assert_eq!(new_system["system_type"], "server");
        assert_eq!(new_system["tags"], json!(["db"]));
        assert_eq!(
            new_system["logical_device"]["panels"][0]["port_groups"],
            json!([{"count": 2, "speed": {"unit": "G", "value": 10}, "roles": ["leaf", "access"]}])
        );
        assert_eq!(spec.new_systems[0].logical_device.port_count() as usize, spec.links.len());
    }

    #[test]
    fn test_lag_mode_parse() {
        assert_eq!("lacp_active".parse::<LagMode>().unwrap(), LagMode::LacpActive);
        assert!("lacp".parse::<LagMode>().is_err());
    }
}
