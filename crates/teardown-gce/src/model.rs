//! Compute and Cloud DNS API objects
//!
//! Only the fields teardown needs are modelled. Field names follow the REST
//! API's camelCase JSON so responses deserialize directly.

use crate::kind::GceResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub name: String,
    /// URL of the zone's region
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnetwork: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplate {
    pub name: String,
    pub self_link: String,
    #[serde(default)]
    pub properties: InstanceProperties,
}

impl InstanceTemplate {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.properties
            .metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.key == key)
            .and_then(|item| item.value.as_deref())
    }

    /// Subnetwork URLs referenced by the template's network interfaces
    pub fn subnetworks(&self) -> impl Iterator<Item = &str> {
        self.properties
            .network_interfaces
            .iter()
            .map(|ni| ni.subnetwork.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManager {
    pub name: String,
    /// Zone URL
    pub zone: String,
    pub self_link: String,
    /// Instance template URL
    pub instance_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    /// Instance URL
    pub instance: String,
    #[serde(default)]
    pub instance_status: Option<String>,
    #[serde(default)]
    pub current_action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    /// Zone URL
    pub zone: String,
    pub self_link: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// URLs of instances the disk is attached to
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPool {
    pub name: String,
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRule {
    pub name: String,
    pub self_link: String,
    /// Target pool URL
    #[serde(default)]
    pub target: String,
    /// Address URL or literal IP
    #[serde(default, rename = "IPAddress")]
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub name: String,
    pub self_link: String,
    #[serde(default)]
    pub target_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteWarning {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub self_link: String,
    /// Instance URL of the next hop, if any
    #[serde(default)]
    pub next_hop_instance: String,
    #[serde(default)]
    pub warnings: Vec<RouteWarning>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub self_link: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnetwork {
    pub name: String,
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    pub name: String,
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZone {
    pub name: String,
    /// Fully qualified, e.g. `example.com.`
    pub dns_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

/// A Cloud DNS change set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsChange {
    pub kind: String,
    #[serde(default)]
    pub deletions: Vec<ResourceRecordSet>,
    #[serde(default)]
    pub is_serving: bool,
}

impl DnsChange {
    pub fn deletions(records: Vec<ResourceRecordSet>) -> Self {
        Self {
            kind: "dns#change".to_string(),
            deletions: records,
            is_serving: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorDetail>,
}

/// A long-running compute operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub self_link: String,
    /// `PENDING`, `RUNNING` or `DONE`
    pub status: String,
    #[serde(default)]
    pub error: Option<OperationError>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }
}

/// Payload attached to every discovered GCE resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "object")]
pub enum GceObject {
    Instance(ManagedInstance),
    InstanceTemplate(InstanceTemplate),
    Disk(Disk),
    InstanceGroupManager(InstanceGroupManager),
    TargetPool(TargetPool),
    FirewallRule(Firewall),
    ForwardingRule(ForwardingRule),
    Address(Address),
    Route(Route),
    Subnet(Subnetwork),
    Router(Router),
    DnsRecord(ResourceRecordSet),
}

impl GceObject {
    pub fn kind(&self) -> GceResourceKind {
        match self {
            GceObject::Instance(_) => GceResourceKind::Instance,
            GceObject::InstanceTemplate(_) => GceResourceKind::InstanceTemplate,
            GceObject::Disk(_) => GceResourceKind::Disk,
            GceObject::InstanceGroupManager(_) => GceResourceKind::InstanceGroupManager,
            GceObject::TargetPool(_) => GceResourceKind::TargetPool,
            GceObject::FirewallRule(_) => GceResourceKind::FirewallRule,
            GceObject::ForwardingRule(_) => GceResourceKind::ForwardingRule,
            GceObject::Address(_) => GceResourceKind::Address,
            GceObject::Route(_) => GceResourceKind::Route,
            GceObject::Subnet(_) => GceResourceKind::Subnet,
            GceObject::Router(_) => GceResourceKind::Router,
            GceObject::DnsRecord(_) => GceResourceKind::DnsRecord,
        }
    }

    /// URL the object is deleted through; DNS records have none
    pub fn self_link(&self) -> Option<&str> {
        match self {
            GceObject::Instance(o) => Some(&o.instance),
            GceObject::InstanceTemplate(o) => Some(&o.self_link),
            GceObject::Disk(o) => Some(&o.self_link),
            GceObject::InstanceGroupManager(o) => Some(&o.self_link),
            GceObject::TargetPool(o) => Some(&o.self_link),
            GceObject::FirewallRule(o) => Some(&o.self_link),
            GceObject::ForwardingRule(o) => Some(&o.self_link),
            GceObject::Address(o) => Some(&o.self_link),
            GceObject::Route(o) => Some(&o.self_link),
            GceObject::Subnet(o) => Some(&o.self_link),
            GceObject::Router(o) => Some(&o.self_link),
            GceObject::DnsRecord(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_api_json() {
        let fr: ForwardingRule = serde_json::from_str(
            r#"{
                "name": "api-c-example-com",
                "selfLink": "https://www.googleapis.com/compute/v1/projects/p/regions/r/forwardingRules/api-c-example-com",
                "target": "https://www.googleapis.com/compute/v1/projects/p/regions/r/targetPools/api-c-example-com",
                "IPAddress": "https://www.googleapis.com/compute/v1/projects/p/regions/r/addresses/api-c-example-com"
            }"#,
        )
        .unwrap();
        assert!(fr.ip_address.ends_with("/addresses/api-c-example-com"));

        let rr: ResourceRecordSet =
            serde_json::from_str(r#"{"name": "api.c.example.com.", "type": "A", "ttl": 60}"#).unwrap();
        assert_eq!(rr.record_type, "A");
        assert!(rr.rrdatas.is_empty());
    }

    #[test]
    fn template_metadata_lookup() {
        let t: InstanceTemplate = serde_json::from_str(
            r#"{
                "name": "nodes-c-example-com",
                "selfLink": "projects/p/global/instanceTemplates/nodes-c-example-com",
                "properties": {
                    "metadata": {"items": [{"key": "cluster-name", "value": " c.example.com "}]},
                    "networkInterfaces": [{"network": "default"}, {"subnetwork": "projects/p/regions/r/subnetworks/s1"}]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(t.metadata_value("cluster-name"), Some(" c.example.com "));
        assert_eq!(t.metadata_value("startup-script"), None);
        assert_eq!(
            t.subnetworks().collect::<Vec<_>>(),
            vec!["projects/p/regions/r/subnetworks/s1"]
        );
        assert_eq!(InstanceTemplate::default().metadata_value("cluster-name"), None);
    }

    #[test]
    fn payload_kind_and_link() {
        let disk = GceObject::Disk(Disk {
            self_link: "projects/p/zones/z/disks/d1".into(),
            ..Default::default()
        });
        assert_eq!(disk.kind(), GceResourceKind::Disk);
        assert_eq!(disk.self_link(), Some("projects/p/zones/z/disks/d1"));
        assert_eq!(GceObject::DnsRecord(ResourceRecordSet::default()).self_link(), None);
    }
}
