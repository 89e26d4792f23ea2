//! Cluster-name conventions for GCE object names
//!
//! GCE names cannot contain dots, so `my.cluster.example.com` becomes
//! `my-cluster-example-com`, and an object called `nodes` in that cluster is
//! named `nodes-my-cluster-example-com`.

/// Label carrying the safe cluster name on disks
pub const LABEL_CLUSTER_NAME: &str = "k8s-io-cluster-name";

/// Instance template metadata key carrying the cluster name
pub const METADATA_CLUSTER_NAME: &str = "cluster-name";

/// Maximum number of `-` separated tokens in an object prefix,
/// e.g. `nodeport-external-to-node-ipv6`
pub const MAX_PREFIX_TOKENS: usize = 5;

const GOSSIP_SUFFIX: &str = ".k8s.local";

/// Record name prefixes managed for a cluster in its DNS zone
const MANAGED_DNS_PREFIXES: [&str; 3] = ["api", "api.internal", "bastion"];

pub fn safe_cluster_name(cluster_name: &str) -> String {
    cluster_name.replace('.', "-")
}

pub fn safe_object_name(name: &str, cluster_name: &str) -> String {
    safe_cluster_name(&format!("{name}-{cluster_name}"))
}

/// Gossip clusters have no DNS zone records to clean up
pub fn is_gossip_hostname(name: &str) -> bool {
    let normalized = format!(".{}", name.trim_end_matches('.'));
    normalized.ends_with(GOSSIP_SUFFIX)
}

/// Name checks against a single cluster
#[derive(Debug, Clone)]
pub struct ClusterNames {
    cluster_name: String,
    safe_name: String,
}

impl ClusterNames {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        let cluster_name = cluster_name.into();
        let safe_name = safe_cluster_name(&cluster_name);
        Self {
            cluster_name,
            safe_name,
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn safe_name(&self) -> &str {
        &self.safe_name
    }

    /// Prefix of routes and firewall target tags created for the cluster
    pub fn tag_prefix(&self) -> String {
        format!("{}-", self.safe_name)
    }

    /// `<prefix>-<safe cluster name>` with a single-token prefix
    pub fn matches(&self, name: &str) -> bool {
        self.matches_multipart(name, 1)
    }

    /// Whether `name` could have been generated for this cluster from a
    /// prefix of up to `max_parts` hyphen-separated tokens
    pub fn matches_multipart(&self, name: &str, max_parts: usize) -> bool {
        let tokens: Vec<&str> = name.split('-').collect();
        (1..=max_parts.min(tokens.len())).any(|i| {
            let prefix = tokens[..i].join("-");
            !prefix.is_empty() && name == safe_object_name(&prefix, &self.cluster_name)
        })
    }

    /// Cluster name as a fully qualified DNS name
    pub fn dns_name(&self) -> String {
        format!("{}.", self.cluster_name)
    }

    /// Whether a managed zone with `zone_dns_name` can hold this cluster's records
    pub fn in_dns_zone(&self, zone_dns_name: &str) -> bool {
        self.dns_name().ends_with(zone_dns_name)
    }

    pub fn is_managed_dns_name(&self, record_name: &str) -> bool {
        let dns_name = self.dns_name();
        MANAGED_DNS_PREFIXES
            .iter()
            .any(|p| record_name == format!("{p}.{dns_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_names() {
        assert_eq!(safe_cluster_name("my.cluster.example.com"), "my-cluster-example-com");
        assert_eq!(safe_object_name("nodes", "c.example.com"), "nodes-c-example-com");
    }

    #[test]
    fn single_token_match() {
        let names = ClusterNames::new("c.example.com");
        assert!(names.matches("api-c-example-com"));
        assert!(!names.matches("api-other-example-com"));
        // a two-token prefix needs the multipart check
        assert!(!names.matches("api-internal-c-example-com"));
        assert!(!names.matches("c-example-com"));
    }

    #[test]
    fn multipart_match() {
        let names = ClusterNames::new("c.example.com");
        assert!(names.matches_multipart("nodeport-external-to-node-ipv6-c-example-com", 5));
        assert!(!names.matches_multipart("nodeport-external-to-node-ipv6-c-example-com", 4));
        assert!(names.matches_multipart("api-internal-c-example-com", 2));
        assert!(!names.matches_multipart("", 5));
    }

    #[test]
    fn gossip_detection() {
        assert!(is_gossip_hostname("c.k8s.local"));
        assert!(is_gossip_hostname("c.k8s.local."));
        assert!(!is_gossip_hostname("c.example.com"));
        assert!(!is_gossip_hostname("notk8s.local"));
    }

    #[test]
    fn managed_dns_names() {
        let names = ClusterNames::new("c.example.com");
        assert!(names.is_managed_dns_name("api.c.example.com."));
        assert!(names.is_managed_dns_name("api.internal.c.example.com."));
        assert!(names.is_managed_dns_name("bastion.c.example.com."));
        assert!(!names.is_managed_dns_name("etcd.c.example.com."));
        assert!(!names.is_managed_dns_name("api.c.example.com"));

        assert!(names.in_dns_zone("example.com."));
        assert!(names.in_dns_zone("c.example.com."));
        assert!(!names.in_dns_zone("other.com."));
    }

    #[test]
    fn tag_prefix() {
        assert_eq!(ClusterNames::new("c.example.com").tag_prefix(), "c-example-com-");
    }
}
