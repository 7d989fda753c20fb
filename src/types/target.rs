//! Target records and target specifications.
//!
//! A [`TargetRecord`] is one row of the registry. A [`TargetSpec`] is what a
//! user types when adding targets:
//! - Single IP addresses (IPv4 and IPv6)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com)

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Placeholder written when a port's service token is missing.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Scope status of a target.
///
/// Only [`ScopeStatus::Active`] is ever written by a scan; every other value
/// is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ScopeStatus {
    /// Never set.
    #[default]
    Unset,
    /// Registered but not yet scanned.
    Pending,
    /// Recon completed for this target.
    Active,
    /// Any externally defined value.
    Other(String),
}

impl ScopeStatus {
    /// Column text for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ScopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ScopeStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" => Self::Unset,
            "PENDING" => Self::Pending,
            "ACTIVE" => Self::Active,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for ScopeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScopeStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// One row of the target registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Unique key of the row.
    pub id: String,
    /// Opaque name column.
    pub label: String,
    /// IP address or hostname to scan.
    pub address: String,
    pub scope_status: ScopeStatus,
    /// Opaque column kept verbatim.
    pub reserved: String,
    /// Composite OS / technology fingerprint.
    pub os_tech: String,
    /// Protocol-qualified port identifiers in discovery order.
    pub open_ports: Vec<String>,
    /// Service names, parallel to `open_ports`.
    pub services: Vec<String>,
}

impl TargetRecord {
    /// Create a record with only its identity columns filled in.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            address: address.into(),
            scope_status: ScopeStatus::Unset,
            reserved: String::new(),
            os_tech: String::new(),
            open_ports: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl fmt::Display for TargetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.address)
    }
}

/// Error type for target parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u128, u128),
}

/// A target specification that may expand into several addresses.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// A hostname, stored as typed.
    Hostname(String),
}

impl TargetSpec {
    /// Maximum number of hosts allowed in a CIDR range.
    pub const MAX_CIDR_HOSTS: u128 = 65536; // /16 for IPv4

    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;

            let host_count = host_count(&network);
            if host_count > Self::MAX_CIDR_HOSTS {
                return Err(TargetError::CidrTooLarge(host_count, Self::MAX_CIDR_HOSTS));
            }

            return Ok(Self::Cidr(network));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Number of addresses covered before network/broadcast filtering.
    pub fn host_count(&self) -> u128 {
        match self {
            Self::Cidr(network) => host_count(network),
            _ => 1,
        }
    }

    /// Expand into the addresses that become registry rows.
    ///
    /// IPv4 network and broadcast addresses are dropped for prefixes below /31.
    pub fn expand(&self) -> Vec<String> {
        match self {
            Self::Single(ip) => vec![ip.to_string()],
            Self::Cidr(network) => network
                .iter()
                .filter(|ip| {
                    if let (IpNetwork::V4(net), IpAddr::V4(addr)) = (network, ip) {
                        if net.prefix() < 31 {
                            return *addr != net.network() && *addr != net.broadcast();
                        }
                    }
                    true
                })
                .map(|ip| ip.to_string())
                .collect(),
            Self::Hostname(hostname) => vec![hostname.clone()],
        }
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

fn host_count(network: &IpNetwork) -> u128 {
    match network {
        IpNetwork::V4(net) => net.size() as u128,
        IpNetwork::V6(net) => {
            let prefix = net.prefix() as u32;
            if prefix >= 128 {
                1
            } else if prefix == 0 {
                u128::MAX
            } else {
                1u128 << (128 - prefix)
            }
        }
    }
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // Each label must be 1-63 characters
    for label in s.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        if !label.chars().last().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}
