use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Port speed unit as the controller spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[serde(rename = "M")]
    M,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "T")]
    T,
}

impl SpeedUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedUnit::M => "M",
            SpeedUnit::G => "G",
            SpeedUnit::T => "T",
        }
    }
}

/// Link or port speed, e.g. `{"unit": "G", "value": 10}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Speed {
    pub unit: SpeedUnit,
    pub value: u32,
}

impl Speed {
    pub fn new(value: u32, unit: SpeedUnit) -> Self {
        Self { unit, value }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// Parses `<number><unit>` such as `10G`, `100M` or `1T`.
impl FromStr for Speed {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || ClientError::Schema(format!("invalid speed '{}'", s));

        let split = s.char_indices().last().map(|(i, _)| i).ok_or_else(bad)?;
        let (digits, unit) = s.split_at(split);
        let unit = match unit.to_ascii_uppercase().as_str() {
            "M" => SpeedUnit::M,
            "G" => SpeedUnit::G,
            "T" => SpeedUnit::T,
            _ => return Err(bad()),
        };
        let value = digits.parse::<u32>().map_err(|_| bad())?;
        if value == 0 {
            return Err(bad());
        }
        Ok(Speed { unit, value })
    }
}

/// Device profile from the design catalog; only the port table is modeled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub ports: Vec<DeviceProfilePort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfilePort {
    pub port_id: u32,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    pub transformation_id: u32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub interfaces: Vec<TransformationInterface>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationInterface {
    pub interface_id: u32,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub speed: Speed,
}

impl DeviceProfile {
    /// Transformation whose interface entry matches `if_name` at exactly
    /// `speed` (same unit and same value).
    pub fn transformation_id(&self, if_name: &str, speed: Speed) -> Option<u32> {
        self.ports
            .iter()
            .flat_map(|port| port.transformations.iter())
            .find(|tf| {
                tf.interfaces
                    .iter()
                    .any(|intf| intf.name == if_name && intf.speed == speed)
            })
            .map(|tf| tf.transformation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_speed() {
        assert_eq!("10G".parse::<Speed>().unwrap(), Speed::new(10, SpeedUnit::G));
        assert_eq!("100g".parse::<Speed>().unwrap(), Speed::new(100, SpeedUnit::G));
        assert_eq!(" 1000M ".parse::<Speed>().unwrap(), Speed::new(1000, SpeedUnit::M));
        assert!("".parse::<Speed>().is_err());
        assert!("G".parse::<Speed>().is_err());
        assert!("10X".parse::<Speed>().is_err());
        assert!("0G".parse::<Speed>().is_err());
        assert!("ten G".parse::<Speed>().is_err());
    }

    #[test]
    fn test_speed_display() {
        assert_eq!(Speed::new(25, SpeedUnit::G).to_string(), "25G");
    }

    #[test]
    fn test_transformation_exact_match() {
        let profile: DeviceProfile = serde_json::from_value(json!({
            "id": "dp1",
            "label": "QFX5120",
            "ports": [{
                "port_id": 1,
                "transformations": [
                    {"transformation_id": 1, "is_default": true, "interfaces": [
                        {"interface_id": 1, "name": "et-0/0/1", "state": "active", "speed": {"unit": "G", "value": 100}}
                    ]},
                    {"transformation_id": 2, "interfaces": [
                        {"interface_id": 1, "name": "et-0/0/1", "state": "active", "speed": {"unit": "G", "value": 1}}
                    ]},
                    {"transformation_id": 3, "interfaces": [
                        {"interface_id": 1, "name": "et-0/0/1", "state": "active", "speed": {"unit": "G", "value": 10}}
                    ]},
                    {"transformation_id": 4, "interfaces": [
                        {"interface_id": 1, "name": "et-0/0/2", "state": "active", "speed": {"unit": "G", "value": 10}}
                    ]}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(profile.transformation_id("et-0/0/1", "10G".parse().unwrap()), Some(3));
        assert_eq!(profile.transformation_id("et-0/0/1", "100G".parse().unwrap()), Some(1));
        assert_eq!(profile.transformation_id("et-0/0/1", "10M".parse().unwrap()), None);
        assert_eq!(profile.transformation_id("et-0/0/9", "10G".parse().unwrap()), None);
    }
}
