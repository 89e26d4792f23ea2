//! GCE resource types discovered for a cluster

use std::fmt;
use std::str::FromStr;

/// Types of GCE resources a cluster owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GceResourceKind {
    Instance,
    InstanceTemplate,
    Disk,
    InstanceGroupManager,
    TargetPool,
    FirewallRule,
    ForwardingRule,
    Address,
    Route,
    Subnet,
    Router,
    DnsRecord,
}

impl GceResourceKind {
    pub const ALL: [GceResourceKind; 12] = [
        GceResourceKind::Instance,
        GceResourceKind::InstanceTemplate,
        GceResourceKind::Disk,
        GceResourceKind::InstanceGroupManager,
        GceResourceKind::TargetPool,
        GceResourceKind::FirewallRule,
        GceResourceKind::ForwardingRule,
        GceResourceKind::Address,
        GceResourceKind::Route,
        GceResourceKind::Subnet,
        GceResourceKind::Router,
        GceResourceKind::DnsRecord,
    ];

    /// Type tag used in resource keys
    pub fn as_str(self) -> &'static str {
        match self {
            GceResourceKind::Instance => "Instance",
            GceResourceKind::InstanceTemplate => "InstanceTemplate",
            GceResourceKind::Disk => "Disk",
            GceResourceKind::InstanceGroupManager => "InstanceGroupManager",
            GceResourceKind::TargetPool => "TargetPool",
            GceResourceKind::FirewallRule => "FirewallRule",
            GceResourceKind::ForwardingRule => "ForwardingRule",
            GceResourceKind::Address => "Address",
            GceResourceKind::Route => "Route",
            GceResourceKind::Subnet => "Subnet",
            GceResourceKind::Router => "Router",
            GceResourceKind::DnsRecord => "DNSRecord",
        }
    }

    /// Whether the resource lives in the compute API and is deleted by self link
    pub fn is_compute(self) -> bool {
        !matches!(self, GceResourceKind::DnsRecord)
    }
}

impl fmt::Display for GceResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GceResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GceResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown GCE resource type: {s}"))
    }
}
