use serde::Serialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use super::ct::Ipv4Addressing;
use crate::error::{ClientError, Result};

/// Body of a `subinterfaces` PATCH: subinterface id -> IPv4 addressing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubinterfaceAddressing {
    pub subinterfaces: BTreeMap<String, SubinterfaceIpv4>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubinterfaceIpv4 {
    pub ipv4_addr_type: Ipv4Addressing,
    pub ipv4_addr: Option<String>,
}

impl SubinterfaceAddressing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a numbered address in `a.b.c.d/len` form
    pub fn numbered(mut self, subinterface_id: impl Into<String>, cidr: &str) -> Result<Self> {
        let cidr = validate_cidr(cidr)?;
        self.subinterfaces.insert(
            subinterface_id.into(),
            SubinterfaceIpv4 {
                ipv4_addr_type: Ipv4Addressing::Numbered,
                ipv4_addr: Some(cidr),
            },
        );
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.subinterfaces.is_empty()
    }
}

/// Check `a.b.c.d/len` and return it trimmed
pub fn validate_cidr(cidr: &str) -> Result<String> {
    let cidr = cidr.trim();
    let bad = || ClientError::Schema(format!("'{}' is not an IPv4 address with prefix length", cidr));

    let (addr, len) = cidr.split_once('/').ok_or_else(bad)?;
    addr.parse::<Ipv4Addr>().map_err(|_| bad())?;
    match len.parse::<u8>() {
        Ok(len) if len <= 32 => Ok(cidr.to_string()),
        _ => Err(bad()),
    }
}
