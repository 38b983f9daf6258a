use serde::Serialize;

/// New interface name for one end of a link
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRename {
    pub link_id: String,
    pub interface_id: String,
    pub if_name: String,
}

/// Body of a `cabling-map` PATCH
#[derive(Debug, Clone, Default, Serialize)]
pub struct CablingMapPatch {
    pub links: Vec<CablingLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CablingLink {
    pub id: String,
    pub endpoints: Vec<CablingEndpoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CablingEndpoint {
    pub interface: CablingInterface,
}

#[derive(Debug, Clone, Serialize)]
pub struct CablingInterface {
    pub id: String,
    pub if_name: String,
}

impl CablingMapPatch {
    /// Group renames by link, keeping first-seen link order
    pub fn from_renames(renames: &[InterfaceRename]) -> Self {
        let mut patch = CablingMapPatch::default();
        for rename in renames {
            let endpoint = CablingEndpoint {
                interface: CablingInterface {
                    id: rename.interface_id.clone(),
                    if_name: rename.if_name.clone(),
                },
            };
            match patch.links.iter_mut().find(|l| l.id == rename.link_id) {
                Some(link) => link.endpoints.push(endpoint),
                None => patch.links.push(CablingLink {
                    id: rename.link_id.clone(),
                    endpoints: vec![endpoint],
                }),
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renames_grouped_by_link() {
        let renames = vec![
            InterfaceRename {
                link_id: "l1".to_string(),
                interface_id: "i-sw".to_string(),
                if_name: "et-0/0/5".to_string(),
            },
            InterfaceRename {
                link_id: "l2".to_string(),
                interface_id: "i-x".to_string(),
                if_name: "eth1".to_string(),
            },
            InterfaceRename {
                link_id: "l1".to_string(),
                interface_id: "i-gs".to_string(),
                if_name: "eth0".to_string(),
            },
        ];
        let patch = CablingMapPatch::from_renames(&renames);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"links": [
                {"id": "l1", "endpoints": [
                    {"interface": {"id": "i-sw", "if_name": "et-0/0/5"}},
                    {"interface": {"id": "i-gs", "if_name": "eth0"}}
                ]},
                {"id": "l2", "endpoints": [
                    {"interface": {"id": "i-x", "if_name": "eth1"}}
                ]}
            ]})
        );
    }
}
