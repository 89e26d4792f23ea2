//! The slice of the Compute and Cloud DNS APIs used by teardown
//!
//! [`GceCloud`] is implemented by a real API client in the binary that hosts
//! teardown, and by an in-memory fake in tests. All methods return classified
//! [`GceError`]s; see [`crate::error::classify_api_error`].

use crate::error::GceError;
use crate::model::{
    Address, Disk, DnsChange, Firewall, ForwardingRule, InstanceGroupManager, InstanceTemplate,
    ManagedInstance, ManagedZone, Operation, ResourceRecordSet, Route, Router, Subnetwork,
    TargetPool, Zone,
};
use crate::url::GoogleCloudUrl;
use async_trait::async_trait;

#[async_trait]
pub trait GceCloud: Send + Sync {
    fn project(&self) -> &str;

    /// Region the client is configured for
    fn region(&self) -> &str;

    async fn list_zones(&self) -> Result<Vec<Zone>, GceError>;

    async fn list_instance_templates(&self) -> Result<Vec<InstanceTemplate>, GceError>;

    async fn list_instance_group_managers(
        &self,
        zone: &str,
    ) -> Result<Vec<InstanceGroupManager>, GceError>;

    async fn list_managed_instances(
        &self,
        igm: &InstanceGroupManager,
    ) -> Result<Vec<ManagedInstance>, GceError>;

    /// Disks across every zone of the project
    async fn aggregated_list_disks(&self) -> Result<Vec<Disk>, GceError>;

    async fn list_target_pools(&self, region: &str) -> Result<Vec<TargetPool>, GceError>;

    async fn list_forwarding_rules(&self, region: &str) -> Result<Vec<ForwardingRule>, GceError>;

    async fn list_firewalls(&self) -> Result<Vec<Firewall>, GceError>;

    async fn list_routes(&self) -> Result<Vec<Route>, GceError>;

    async fn list_addresses(&self, region: &str) -> Result<Vec<Address>, GceError>;

    async fn list_subnetworks(&self, region: &str) -> Result<Vec<Subnetwork>, GceError>;

    async fn list_routers(&self, region: &str) -> Result<Vec<Router>, GceError>;

    async fn list_managed_zones(&self) -> Result<Vec<ManagedZone>, GceError>;

    async fn list_resource_record_sets(
        &self,
        managed_zone: &str,
    ) -> Result<Vec<ResourceRecordSet>, GceError>;

    async fn create_dns_change(
        &self,
        managed_zone: &str,
        change: &DnsChange,
    ) -> Result<DnsChange, GceError>;

    /// Start deleting the compute resource at `url`
    async fn delete(&self, url: &GoogleCloudUrl) -> Result<Operation, GceError>;

    /// Refresh a long-running operation
    async fn get_operation(&self, operation: &Operation) -> Result<Operation, GceError>;
}
