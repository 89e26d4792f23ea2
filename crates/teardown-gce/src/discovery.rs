//! Cluster resource discovery on GCE
//!
//! Every listing filters the project's resources down to those created for one
//! cluster, using the naming and labelling conventions in [`crate::names`].
//! Listings run concurrently; routes are listed afterwards because they are
//! matched against the discovered instances.

use crate::cloud::GceCloud;
use crate::config::GceTeardownConfig;
use crate::delete::{ComputeDeleter, DnsRecordGroupDeleter, ManagedInstanceDumper};
use crate::error::GceError;
use crate::kind::GceResourceKind;
use crate::model::{GceObject, InstanceGroupManager, InstanceTemplate};
use crate::names::{
    ClusterNames, LABEL_CLUSTER_NAME, MAX_PREFIX_TOKENS, METADATA_CLUSTER_NAME, is_gossip_hostname,
};
use crate::url::{GoogleCloudUrl, last_component};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use teardown_core::{
    Deleter, DiscoveryAdapter, DiscoveryError, GroupDeleter, Listing, Resource, ResourceKey,
    collect_listings,
};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Warning GCE attaches to routes whose next-hop instance no longer exists
const NEXT_HOP_INSTANCE_NOT_FOUND: &str = "NEXT_HOP_INSTANCE_NOT_FOUND";

type GceResource = Resource<GceObject>;

fn listing_error(what: &str) -> impl FnOnce(GceError) -> DiscoveryError + '_ {
    move |e| DiscoveryError::listing(what, e)
}

/// Discovers every GCE resource belonging to one cluster
pub struct GceClusterDiscovery {
    cloud: Arc<dyn GceCloud>,
    names: ClusterNames,
    region: String,
    compute: Arc<ComputeDeleter>,
    dns: Arc<DnsRecordGroupDeleter>,
    instance_dumper: Arc<ManagedInstanceDumper>,
    /// Cluster templates, listed once per adapter
    templates: OnceCell<Vec<InstanceTemplate>>,
}

impl GceClusterDiscovery {
    pub fn new(cloud: Arc<dyn GceCloud>, config: &GceTeardownConfig) -> Self {
        Self::build(cloud, config, None)
    }

    /// Like [`GceClusterDiscovery::new`], with operation polling abandoned when
    /// `token` fires
    pub fn with_cancellation(
        cloud: Arc<dyn GceCloud>,
        config: &GceTeardownConfig,
        token: CancellationToken,
    ) -> Self {
        Self::build(cloud, config, Some(token))
    }

    fn build(
        cloud: Arc<dyn GceCloud>,
        config: &GceTeardownConfig,
        cancel: Option<CancellationToken>,
    ) -> Self {
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| cloud.region().to_string());
        let mut compute = ComputeDeleter::new(cloud.clone(), config);
        if let Some(token) = cancel {
            compute = compute.with_cancellation(token);
        }
        Self {
            names: ClusterNames::new(config.cluster_name.as_str()),
            region,
            compute: Arc::new(compute),
            dns: Arc::new(DnsRecordGroupDeleter::new(cloud.clone())),
            instance_dumper: Arc::new(ManagedInstanceDumper),
            templates: OnceCell::new(),
            cloud,
        }
    }

    pub fn cluster_name(&self) -> &str {
        self.names.cluster_name()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn compute_deleter(&self) -> Arc<dyn Deleter<GceObject>> {
        self.compute.clone()
    }

    fn compute_resource(
        &self,
        kind: GceResourceKind,
        id: &str,
        name: &str,
        obj: GceObject,
    ) -> GceResource {
        Resource::new(kind.as_str(), id, name, obj).with_deleter(self.compute_deleter())
    }

    /// Zones of the project inside the target region
    pub async fn zones(&self) -> Result<Vec<String>, DiscoveryError> {
        let zones = self
            .cloud
            .list_zones()
            .await
            .map_err(listing_error("zones"))?;

        let mut in_region = Vec::new();
        for zone in zones {
            let region = GoogleCloudUrl::parse(&zone.region).map_err(listing_error("zones"))?;
            if region.name == self.region {
                in_region.push(zone.name);
            }
        }
        if in_region.is_empty() {
            return Err(DiscoveryError::Scope(format!(
                "unable to determine zones in region {:?}",
                self.region
            )));
        }
        Ok(in_region)
    }

    /// Instance templates whose `cluster-name` metadata names this cluster
    async fn cluster_templates(&self) -> Result<&[InstanceTemplate], DiscoveryError> {
        let templates = self
            .templates
            .get_or_try_init(|| async {
                let all = self
                    .cloud
                    .list_instance_templates()
                    .await
                    .map_err(listing_error("instance templates"))?;
                Ok::<_, DiscoveryError>(
                    all.into_iter()
                        .filter(|t| {
                            t.metadata_value(METADATA_CLUSTER_NAME)
                                .is_some_and(|v| v.trim() == self.names.cluster_name())
                        })
                        .collect(),
                )
            })
            .await?;
        Ok(templates.as_slice())
    }

    async fn list_instance_templates(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let templates = self.cluster_templates().await?;
        Ok(templates
            .iter()
            .map(|t| {
                debug!(url = %t.self_link, "Found resource");
                self.compute_resource(
                    GceResourceKind::InstanceTemplate,
                    &t.name,
                    &t.name,
                    GceObject::InstanceTemplate(t.clone()),
                )
            })
            .collect())
    }

    async fn list_instance_group_managers(
        &self,
        zones: &[String],
    ) -> Result<Vec<GceResource>, DiscoveryError> {
        let templates: HashMap<&str, &InstanceTemplate> = self
            .cluster_templates()
            .await?
            .iter()
            .map(|t| (t.self_link.as_str(), t))
            .collect();

        let mut resources = Vec::new();
        for zone in zones {
            let igms = self
                .cloud
                .list_instance_group_managers(zone)
                .await
                .map_err(listing_error("instance group managers"))?;

            for igm in igms {
                let Some(template) = templates.get(igm.instance_template.as_str()) else {
                    debug!(
                        template = %igm.instance_template,
                        "Ignoring MIG with unmanaged instance template"
                    );
                    continue;
                };

                debug!(url = %igm.self_link, "Found resource");
                let instances = self.list_managed_instances(&igm).await?;
                resources.push(
                    self.compute_resource(
                        GceResourceKind::InstanceGroupManager,
                        &format!("{zone}/{}", igm.name),
                        &igm.name,
                        GceObject::InstanceGroupManager(igm.clone()),
                    )
                    .blocks(ResourceKey::new(
                        GceResourceKind::InstanceTemplate.as_str(),
                        &template.name,
                    )),
                );
                resources.extend(instances);
            }
        }
        Ok(resources)
    }

    /// Instances of a group; they do not block deleting the group itself
    async fn list_managed_instances(
        &self,
        igm: &InstanceGroupManager,
    ) -> Result<Vec<GceResource>, DiscoveryError> {
        let zone = last_component(&igm.zone);
        let instances = self
            .cloud
            .list_managed_instances(igm)
            .await
            .map_err(listing_error("instances in instance group manager"))?;

        Ok(instances
            .into_iter()
            .map(|instance| {
                let name = last_component(&instance.instance).to_string();
                self.compute_resource(
                    GceResourceKind::Instance,
                    &format!("{zone}/{name}"),
                    &name,
                    GceObject::Instance(instance),
                )
                .with_dumper(self.instance_dumper.clone())
            })
            .collect())
    }

    /// Disks labelled with the cluster, blocked by the instances using them
    async fn list_disks(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let disks = self
            .cloud
            .aggregated_list_disks()
            .await
            .map_err(listing_error("disks"))?;

        Ok(disks
            .into_iter()
            .filter(|d| {
                d.labels.get(LABEL_CLUSTER_NAME).map(String::as_str) == Some(self.names.safe_name())
            })
            .map(|disk| {
                debug!(url = %disk.self_link, "Found resource");
                let zone = last_component(&disk.zone).to_string();
                let blockers: Vec<ResourceKey> = disk
                    .users
                    .iter()
                    .map(|u| {
                        ResourceKey::new(
                            GceResourceKind::Instance.as_str(),
                            &format!("{zone}/{}", last_component(u)),
                        )
                    })
                    .collect();
                let name = disk.name.clone();
                blockers.into_iter().fold(
                    self.compute_resource(
                        GceResourceKind::Disk,
                        &name,
                        &name,
                        GceObject::Disk(disk),
                    ),
                    Resource::blocked_by,
                )
            })
            .collect())
    }

    async fn list_target_pools(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let pools = self
            .cloud
            .list_target_pools(&self.region)
            .await
            .map_err(listing_error("target pools"))?;

        Ok(pools
            .into_iter()
            .filter(|tp| self.names.matches(&tp.name))
            .map(|tp| {
                debug!(url = %tp.self_link, "Found resource");
                let name = tp.name.clone();
                self.compute_resource(
                    GceResourceKind::TargetPool,
                    &name,
                    &name,
                    GceObject::TargetPool(tp),
                )
            })
            .collect())
    }

    /// Forwarding rules block their target pool and address
    async fn list_forwarding_rules(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let rules = self
            .cloud
            .list_forwarding_rules(&self.region)
            .await
            .map_err(listing_error("forwarding rules"))?;

        Ok(rules
            .into_iter()
            .filter(|fr| self.names.matches(&fr.name))
            .map(|fr| {
                debug!(url = %fr.self_link, "Found resource");
                let mut resource = self.compute_resource(
                    GceResourceKind::ForwardingRule,
                    &fr.name,
                    &fr.name,
                    GceObject::ForwardingRule(fr.clone()),
                );
                if !fr.target.is_empty() {
                    resource = resource.blocks(ResourceKey::new(
                        GceResourceKind::TargetPool.as_str(),
                        last_component(&fr.target),
                    ));
                }
                if !fr.ip_address.is_empty() {
                    resource = resource.blocks(ResourceKey::new(
                        GceResourceKind::Address.as_str(),
                        last_component(&fr.ip_address),
                    ));
                }
                resource
            })
            .collect())
    }

    /// Firewall rules named for the cluster and targeting its instances
    async fn list_firewall_rules(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let firewalls = self
            .cloud
            .list_firewalls()
            .await
            .map_err(listing_error("firewall rules"))?;
        let tag_prefix = self.names.tag_prefix();

        let mut resources = Vec::new();
        for fw in firewalls {
            if !self.names.matches_multipart(&fw.name, MAX_PREFIX_TOKENS) {
                continue;
            }
            if !fw.target_tags.iter().any(|t| t.starts_with(&tag_prefix)) {
                debug!(name = %fw.name, "Skipping firewall rule without a cluster target tag");
                continue;
            }
            debug!(url = %fw.self_link, "Found resource");
            let name = fw.name.clone();
            resources.push(self.compute_resource(
                GceResourceKind::FirewallRule,
                &name,
                &name,
                GceObject::FirewallRule(fw),
            ));
        }
        Ok(resources)
    }

    async fn list_addresses(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let addresses = self
            .cloud
            .list_addresses(&self.region)
            .await
            .map_err(listing_error("addresses"))?;

        Ok(addresses
            .into_iter()
            .filter(|a| self.names.matches(&a.name))
            .map(|a| {
                debug!(url = %a.self_link, "Found resource");
                let name = a.name.clone();
                self.compute_resource(GceResourceKind::Address, &name, &name, GceObject::Address(a))
            })
            .collect())
    }

    /// Subnets named for the cluster and used by one of its templates
    async fn list_subnets(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let template_subnets: HashSet<&str> = self
            .cluster_templates()
            .await?
            .iter()
            .flat_map(InstanceTemplate::subnetworks)
            .collect();

        let subnets = self
            .cloud
            .list_subnetworks(&self.region)
            .await
            .map_err(listing_error("subnetworks"))?;

        let mut resources = Vec::new();
        for subnet in subnets {
            if !self.names.matches(&subnet.name) {
                continue;
            }
            if !template_subnets.contains(subnet.self_link.as_str()) {
                warn!(
                    url = %subnet.self_link,
                    "Skipping subnetwork that no instance template uses"
                );
                continue;
            }
            debug!(url = %subnet.self_link, "Found resource");
            let name = subnet.name.clone();
            resources.push(self.compute_resource(
                GceResourceKind::Subnet,
                &name,
                &name,
                GceObject::Subnet(subnet),
            ));
        }
        Ok(resources)
    }

    async fn list_routers(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let routers = self
            .cloud
            .list_routers(&self.region)
            .await
            .map_err(listing_error("routers"))?;

        Ok(routers
            .into_iter()
            .filter(|r| self.names.matches(&r.name))
            .map(|r| {
                debug!(url = %r.self_link, "Found resource");
                let name = r.name.clone();
                self.compute_resource(GceResourceKind::Router, &name, &name, GceObject::Router(r))
            })
            .collect())
    }

    /// `A` records for the cluster's API and bastion names, grouped by zone
    async fn list_dns_records(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        if is_gossip_hostname(self.names.cluster_name()) {
            debug!("Gossip cluster, skipping DNS");
            return Ok(Vec::new());
        }

        let zones = self
            .cloud
            .list_managed_zones()
            .await
            .map_err(listing_error("DNS zones"))?;

        let mut resources = Vec::new();
        for zone in zones.iter().filter(|z| self.names.in_dns_zone(&z.dns_name)) {
            let records = self
                .cloud
                .list_resource_record_sets(&zone.name)
                .await
                .map_err(listing_error("DNS records"))?;

            for record in records {
                if record.record_type != "A" || !self.names.is_managed_dns_name(&record.name) {
                    continue;
                }
                let dns: Arc<dyn GroupDeleter<GceObject>> = self.dns.clone();
                resources.push(
                    Resource::new(
                        GceResourceKind::DnsRecord.as_str(),
                        record.name.as_str(),
                        record.name.as_str(),
                        GceObject::DnsRecord(record.clone()),
                    )
                    .with_group_deleter(zone.name.as_str(), dns),
                );
            }
        }
        Ok(resources)
    }

    /// Routes created for the cluster whose next hop is gone or is one of `instances`
    async fn list_routes(
        &self,
        instances: &HashSet<String>,
    ) -> Result<Vec<GceResource>, DiscoveryError> {
        let routes = self
            .cloud
            .list_routes()
            .await
            .map_err(listing_error("routes"))?;
        let prefix = self.names.tag_prefix();

        let mut resources = Vec::new();
        for route in routes {
            if !route.name.starts_with(&prefix) {
                continue;
            }

            let mut remove = false;
            for warning in &route.warnings {
                if warning.code == NEXT_HOP_INSTANCE_NOT_FOUND {
                    remove = true;
                } else {
                    info!(route = %route.name, code = %warning.code, "Unknown warning on route");
                }
            }

            if !route.next_hop_instance.is_empty() {
                match GoogleCloudUrl::parse(&route.next_hop_instance) {
                    Ok(hop) => {
                        let zone = hop.zone.unwrap_or_default();
                        if instances.contains(&format!("{zone}/{}", hop.name)) {
                            remove = true;
                        }
                    }
                    Err(e) => {
                        warn!(
                            route = %route.name,
                            next_hop = %route.next_hop_instance,
                            error = %e,
                            "Skipping unparseable next hop"
                        );
                    }
                }
            }

            if remove {
                debug!(url = %route.self_link, "Found resource");
                let name = route.name.clone();
                resources.push(self.compute_resource(
                    GceResourceKind::Route,
                    &name,
                    &name,
                    GceObject::Route(route),
                ));
            }
        }
        Ok(resources)
    }
}

#[async_trait]
impl DiscoveryAdapter for GceClusterDiscovery {
    type Payload = GceObject;

    fn provider(&self) -> &str {
        "gce"
    }

    async fn discover(&self) -> Result<Vec<GceResource>, DiscoveryError> {
        let zones = self.zones().await?;
        info!(zones = ?zones, region = %self.region, "Scanning zones");

        let listings: Vec<Listing<'_, GceObject>> = vec![
            self.list_instance_templates().boxed(),
            self.list_instance_group_managers(&zones).boxed(),
            self.list_target_pools().boxed(),
            self.list_forwarding_rules().boxed(),
            self.list_firewall_rules().boxed(),
            self.list_disks().boxed(),
            self.list_dns_records().boxed(),
            self.list_addresses().boxed(),
            self.list_subnets().boxed(),
            self.list_routers().boxed(),
        ];
        let mut graph = collect_listings(listings).await?;

        // Routes are matched against instances found above
        let instances: HashSet<String> = graph
            .all()
            .filter(|r| r.resource_type == GceResourceKind::Instance.as_str())
            .map(|r| r.id.clone())
            .collect();
        graph.extend(self.list_routes(&instances).await?);

        graph.prune_done();
        info!(
            cluster = %self.names.cluster_name(),
            count = graph.len(),
            "Discovered cluster resources"
        );
        Ok(graph.into_resources())
    }
}
