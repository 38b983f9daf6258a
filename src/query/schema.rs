use std::fmt;

/// Node types in the blueprint graph that this client queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    System,
    Interface,
    Link,
    VirtualNetwork,
    EpEndpointPolicy,
    EpApplicationInstance,
    SecurityZone,
    InterfaceMap,
    LogicalDevice,
    Tag,
    Rack,
    RedundancyGroup,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::System => "system",
            NodeKind::Interface => "interface",
            NodeKind::Link => "link",
            NodeKind::VirtualNetwork => "virtual_network",
            NodeKind::EpEndpointPolicy => "ep_endpoint_policy",
            NodeKind::EpApplicationInstance => "ep_application_instance",
            NodeKind::SecurityZone => "security_zone",
            NodeKind::InterfaceMap => "interface_map",
            NodeKind::LogicalDevice => "logical_device",
            NodeKind::Tag => "tag",
            NodeKind::Rack => "rack",
            NodeKind::RedundancyGroup => "redundancy_group",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types connecting graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    HostedInterfaces,
    Link,
    ComposedOf,
    PartOfRack,
    InterfaceMap,
    LogicalDevice,
    Tag,
    VnToAttach,
    EpFirstSubpolicy,
    EpSubpolicy,
    EpNested,
    MemberInterfaces,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::HostedInterfaces => "hosted_interfaces",
            EdgeKind::Link => "link",
            EdgeKind::ComposedOf => "composed_of",
            EdgeKind::PartOfRack => "part_of_rack",
            EdgeKind::InterfaceMap => "interface_map",
            EdgeKind::LogicalDevice => "logical_device",
            EdgeKind::Tag => "tag",
            EdgeKind::VnToAttach => "vn_to_attach",
            EdgeKind::EpFirstSubpolicy => "ep_first_subpolicy",
            EdgeKind::EpSubpolicy => "ep_subpolicy",
            EdgeKind::EpNested => "ep_nested",
            EdgeKind::MemberInterfaces => "member_interfaces",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
