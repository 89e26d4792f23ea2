//! In-memory GCE used by the integration tests
//!
//! Deleted objects disappear from listings. Objects registered as in use by a
//! live dependent refuse deletion the way GCE does, so a wrong deletion order
//! shows up as a failure.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use teardown_gce::GceError;
use teardown_gce::cloud::GceCloud;
use teardown_gce::model::{
    Address, Disk, DnsChange, Firewall, ForwardingRule, InstanceGroupManager, InstanceProperties,
    InstanceTemplate, ManagedInstance, ManagedZone, Metadata, MetadataItem, NetworkInterface,
    Operation, OperationError, OperationErrorDetail, ResourceRecordSet, Route, RouteWarning,
    Router, Subnetwork, TargetPool, Zone,
};
use teardown_gce::url::GoogleCloudUrl;

pub const PROJECT: &str = "test-project";
pub const REGION: &str = "us-central1";
pub const ZONE_A: &str = "us-central1-a";

/// Full compute self link for `path` below the project
pub fn link(path: &str) -> String {
    format!("https://www.googleapis.com/compute/v1/projects/{PROJECT}/{path}")
}

pub fn zonal(zone: &str, collection: &str, name: &str) -> String {
    link(&format!("zones/{zone}/{collection}/{name}"))
}

pub fn regional(collection: &str, name: &str) -> String {
    link(&format!("regions/{REGION}/{collection}/{name}"))
}

pub fn global(collection: &str, name: &str) -> String {
    link(&format!("global/{collection}/{name}"))
}

#[derive(Default)]
struct State {
    zones: Vec<Zone>,
    templates: Vec<InstanceTemplate>,
    igms: Vec<InstanceGroupManager>,
    managed: HashMap<String, Vec<ManagedInstance>>,
    disks: Vec<Disk>,
    target_pools: Vec<TargetPool>,
    forwarding_rules: Vec<ForwardingRule>,
    firewalls: Vec<Firewall>,
    routes: Vec<Route>,
    addresses: Vec<Address>,
    subnets: Vec<Subnetwork>,
    routers: Vec<Router>,
    managed_zones: Vec<ManagedZone>,
    records: BTreeMap<String, Vec<ResourceRecordSet>>,

    /// Self links that no longer exist
    gone: HashSet<String>,
    /// link -> links of objects that must be gone first
    used_by: HashMap<String, Vec<String>>,
    /// Errors returned by the next delete calls for a link
    delete_errors: HashMap<String, VecDeque<GceError>>,
    /// Error code reported by the operation deleting a link, once
    operation_errors: HashMap<String, String>,
    /// Polls before an operation reports DONE
    polls_until_done: u32,
    operations: HashMap<String, (String, u32)>,

    deleted: Vec<String>,
    delete_calls: HashMap<String, u32>,
    dns_changes: Vec<(String, DnsChange)>,
    template_lists: u32,
    zone_lists: u32,
}

pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Self {
        let cloud = Self {
            state: Mutex::new(State::default()),
        };
        for (zone, region) in [
            ("us-central1-a", "us-central1"),
            ("us-central1-b", "us-central1"),
            ("europe-west1-b", "europe-west1"),
        ] {
            cloud.state().zones.push(Zone {
                name: zone.to_string(),
                region: link(&format!("regions/{region}")),
            });
        }
        cloud
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn live<T: Clone>(&self, items: &[T], link: impl Fn(&T) -> &str) -> Vec<T> {
        let state = self.state();
        items
            .iter()
            .filter(|i| !state.gone.contains(link(i)))
            .cloned()
            .collect()
    }

    pub fn add_template(&self, name: &str, cluster_name: &str, subnetwork: Option<&str>) -> String {
        let self_link = global("instanceTemplates", name);
        let mut network_interfaces = vec![NetworkInterface {
            network: global("networks", "default"),
            subnetwork: String::new(),
        }];
        if let Some(subnet) = subnetwork {
            network_interfaces[0].subnetwork = subnet.to_string();
        }
        self.state().templates.push(InstanceTemplate {
            name: name.to_string(),
            self_link: self_link.clone(),
            properties: InstanceProperties {
                metadata: Some(Metadata {
                    items: vec![MetadataItem {
                        key: "cluster-name".to_string(),
                        value: Some(cluster_name.to_string()),
                    }],
                }),
                network_interfaces,
            },
        });
        self_link
    }

    /// Add a group with its instances, which keep the template in use
    pub fn add_igm(&self, zone: &str, name: &str, template: &str, instances: &[&str]) -> Vec<String> {
        let self_link = zonal(zone, "instanceGroupManagers", name);
        let instance_links: Vec<String> = instances
            .iter()
            .map(|i| zonal(zone, "instances", i))
            .collect();
        let mut state = self.state();
        state.igms.push(InstanceGroupManager {
            name: name.to_string(),
            zone: link(&format!("zones/{zone}")),
            self_link: self_link.clone(),
            instance_template: template.to_string(),
        });
        state.managed.insert(
            self_link.clone(),
            instance_links
                .iter()
                .map(|l| ManagedInstance {
                    instance: l.clone(),
                    instance_status: Some("RUNNING".to_string()),
                    current_action: Some("NONE".to_string()),
                })
                .collect(),
        );
        state
            .used_by
            .entry(template.to_string())
            .or_default()
            .push(self_link);
        instance_links
    }

    pub fn add_disk(&self, zone: &str, name: &str, cluster_label: &str, users: &[String]) -> String {
        let self_link = zonal(zone, "disks", name);
        let mut state = self.state();
        state.disks.push(Disk {
            name: name.to_string(),
            zone: link(&format!("zones/{zone}")),
            self_link: self_link.clone(),
            labels: [("k8s-io-cluster-name".to_string(), cluster_label.to_string())].into(),
            users: users.to_vec(),
        });
        state
            .used_by
            .insert(self_link.clone(), users.to_vec());
        self_link
    }

    pub fn add_target_pool(&self, name: &str) -> String {
        let self_link = regional("targetPools", name);
        self.state().target_pools.push(TargetPool {
            name: name.to_string(),
            self_link: self_link.clone(),
        });
        self_link
    }

    pub fn add_address(&self, name: &str) -> String {
        let self_link = regional("addresses", name);
        self.state().addresses.push(Address {
            name: name.to_string(),
            self_link: self_link.clone(),
            address: "203.0.113.10".to_string(),
        });
        self_link
    }

    /// Add a forwarding rule that keeps its target pool and address in use
    pub fn add_forwarding_rule(&self, name: &str, target: &str, address: &str) -> String {
        let self_link = regional("forwardingRules", name);
        let mut state = self.state();
        state.forwarding_rules.push(ForwardingRule {
            name: name.to_string(),
            self_link: self_link.clone(),
            target: target.to_string(),
            ip_address: address.to_string(),
        });
        for used in [target, address] {
            state
                .used_by
                .entry(used.to_string())
                .or_default()
                .push(self_link.clone());
        }
        self_link
    }

    pub fn add_firewall(&self, name: &str, target_tags: &[&str]) -> String {
        let self_link = global("firewalls", name);
        self.state().firewalls.push(Firewall {
            name: name.to_string(),
            self_link: self_link.clone(),
            target_tags: target_tags.iter().map(|t| t.to_string()).collect(),
        });
        self_link
    }

    pub fn add_route(&self, name: &str, next_hop_instance: &str, warnings: &[&str]) -> String {
        let self_link = global("routes", name);
        self.state().routes.push(Route {
            name: name.to_string(),
            self_link: self_link.clone(),
            next_hop_instance: next_hop_instance.to_string(),
            warnings: warnings
                .iter()
                .map(|code| RouteWarning {
                    code: code.to_string(),
                    message: String::new(),
                })
                .collect(),
        });
        self_link
    }

    /// Add a subnet kept in use by `users`
    pub fn add_subnet(&self, name: &str, users: &[String]) -> String {
        let self_link = regional("subnetworks", name);
        let mut state = self.state();
        state.subnets.push(Subnetwork {
            name: name.to_string(),
            self_link: self_link.clone(),
        });
        state.used_by.insert(self_link.clone(), users.to_vec());
        self_link
    }

    pub fn add_router(&self, name: &str) -> String {
        let self_link = regional("routers", name);
        self.state().routers.push(Router {
            name: name.to_string(),
            self_link: self_link.clone(),
        });
        self_link
    }

    pub fn add_managed_zone(&self, name: &str, dns_name: &str) {
        self.state().managed_zones.push(ManagedZone {
            name: name.to_string(),
            dns_name: dns_name.to_string(),
        });
    }

    pub fn add_record(&self, zone: &str, name: &str, record_type: &str) {
        self.state()
            .records
            .entry(zone.to_string())
            .or_default()
            .push(ResourceRecordSet {
                name: name.to_string(),
                record_type: record_type.to_string(),
                ttl: 60,
                rrdatas: vec!["203.0.113.10".to_string()],
            });
    }

    /// Make the next delete calls for `link` fail with `errors`, in order
    pub fn fail_deletes(&self, link: &str, errors: Vec<GceError>) {
        self.state()
            .delete_errors
            .insert(link.to_string(), errors.into());
    }

    /// Make the operation deleting `link` fail once with `code`
    pub fn fail_operation(&self, link: &str, code: &str) {
        self.state()
            .operation_errors
            .insert(link.to_string(), code.to_string());
    }

    pub fn set_polls_until_done(&self, polls: u32) {
        self.state().polls_until_done = polls;
    }

    /// Delete `link` behind the adapter's back
    pub fn remove_externally(&self, link: &str) {
        self.state().gone.insert(link.to_string());
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn is_gone(&self, link: &str) -> bool {
        self.state().gone.contains(link)
    }

    pub fn delete_calls(&self, link: &str) -> u32 {
        self.state().delete_calls.get(link).copied().unwrap_or(0)
    }

    pub fn dns_changes(&self) -> Vec<(String, DnsChange)> {
        self.state().dns_changes.clone()
    }

    pub fn template_lists(&self) -> u32 {
        self.state().template_lists
    }

    pub fn record_count(&self) -> usize {
        self.state().records.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl GceCloud for FakeCloud {
    fn project(&self) -> &str {
        PROJECT
    }

    fn region(&self) -> &str {
        REGION
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, GceError> {
        let mut state = self.state();
        state.zone_lists += 1;
        Ok(state.zones.clone())
    }

    async fn list_instance_templates(&self) -> Result<Vec<InstanceTemplate>, GceError> {
        let templates = {
            let mut state = self.state();
            state.template_lists += 1;
            state.templates.clone()
        };
        Ok(self.live(&templates, |t| t.self_link.as_str()))
    }

    async fn list_instance_group_managers(
        &self,
        zone: &str,
    ) -> Result<Vec<InstanceGroupManager>, GceError> {
        let igms: Vec<_> = self
            .state()
            .igms
            .iter()
            .filter(|igm| igm.zone.ends_with(&format!("/{zone}")))
            .cloned()
            .collect();
        Ok(self.live(&igms, |igm| igm.self_link.as_str()))
    }

    async fn list_managed_instances(
        &self,
        igm: &InstanceGroupManager,
    ) -> Result<Vec<ManagedInstance>, GceError> {
        let instances = self
            .state()
            .managed
            .get(&igm.self_link)
            .cloned()
            .unwrap_or_default();
        Ok(self.live(&instances, |i| i.instance.as_str()))
    }

    async fn aggregated_list_disks(&self) -> Result<Vec<Disk>, GceError> {
        let disks = self.state().disks.clone();
        Ok(self.live(&disks, |d| d.self_link.as_str()))
    }

    async fn list_target_pools(&self, _region: &str) -> Result<Vec<TargetPool>, GceError> {
        let pools = self.state().target_pools.clone();
        Ok(self.live(&pools, |p| p.self_link.as_str()))
    }

    async fn list_forwarding_rules(&self, _region: &str) -> Result<Vec<ForwardingRule>, GceError> {
        let rules = self.state().forwarding_rules.clone();
        Ok(self.live(&rules, |r| r.self_link.as_str()))
    }

    async fn list_firewalls(&self) -> Result<Vec<Firewall>, GceError> {
        let firewalls = self.state().firewalls.clone();
        Ok(self.live(&firewalls, |f| f.self_link.as_str()))
    }

    async fn list_routes(&self) -> Result<Vec<Route>, GceError> {
        let routes = self.state().routes.clone();
        Ok(self.live(&routes, |r| r.self_link.as_str()))
    }

    async fn list_addresses(&self, _region: &str) -> Result<Vec<Address>, GceError> {
        let addresses = self.state().addresses.clone();
        Ok(self.live(&addresses, |a| a.self_link.as_str()))
    }

    async fn list_subnetworks(&self, _region: &str) -> Result<Vec<Subnetwork>, GceError> {
        let subnets = self.state().subnets.clone();
        Ok(self.live(&subnets, |s| s.self_link.as_str()))
    }

    async fn list_routers(&self, _region: &str) -> Result<Vec<Router>, GceError> {
        let routers = self.state().routers.clone();
        Ok(self.live(&routers, |r| r.self_link.as_str()))
    }

    async fn list_managed_zones(&self) -> Result<Vec<ManagedZone>, GceError> {
        Ok(self.state().managed_zones.clone())
    }

    async fn list_resource_record_sets(
        &self,
        managed_zone: &str,
    ) -> Result<Vec<ResourceRecordSet>, GceError> {
        Ok(self
            .state()
            .records
            .get(managed_zone)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_dns_change(
        &self,
        managed_zone: &str,
        change: &DnsChange,
    ) -> Result<DnsChange, GceError> {
        let mut state = self.state();
        let records = state.records.entry(managed_zone.to_string()).or_default();
        for deletion in &change.deletions {
            let Some(pos) = records.iter().position(|r| r == deletion) else {
                return Err(GceError::NotFound(deletion.name.clone()));
            };
            records.remove(pos);
        }
        state
            .dns_changes
            .push((managed_zone.to_string(), change.clone()));
        Ok(change.clone())
    }

    async fn delete(&self, url: &GoogleCloudUrl) -> Result<Operation, GceError> {
        let target = url.to_string();
        let mut state = self.state();
        *state.delete_calls.entry(target.clone()).or_default() += 1;

        if let Some(e) = state
            .delete_errors
            .get_mut(&target)
            .and_then(VecDeque::pop_front)
        {
            return Err(e);
        }
        if state.gone.contains(&target) {
            return Err(GceError::NotFound(target));
        }
        let in_use = state
            .used_by
            .get(&target)
            .is_some_and(|users| users.iter().any(|u| !state.gone.contains(u)));
        if in_use {
            return Err(GceError::ResourceInUse(target));
        }

        let name = format!("operation-{}", state.operations.len() + 1);
        let polls = state.polls_until_done;
        state.operations.insert(name.clone(), (target.clone(), polls));
        Ok(Operation {
            self_link: link(&format!("global/operations/{name}")),
            name,
            status: "RUNNING".to_string(),
            error: None,
        })
    }

    async fn get_operation(&self, operation: &Operation) -> Result<Operation, GceError> {
        let mut state = self.state();
        let Some((target, remaining)) = state.operations.get_mut(&operation.name) else {
            return Err(GceError::NotFound(operation.name.clone()));
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(operation.clone());
        }
        let target = target.clone();

        let mut done = Operation {
            status: "DONE".to_string(),
            ..operation.clone()
        };
        if let Some(code) = state.operation_errors.remove(&target) {
            done.error = Some(OperationError {
                errors: vec![OperationErrorDetail {
                    code,
                    message: format!("operation on {target} failed"),
                }],
            });
        } else if state.gone.insert(target.clone()) {
            state.deleted.push(target);
        }
        state.operations.remove(&operation.name);
        Ok(done)
    }
}
