//! Discovery adapter contract
//!
//! A provider crate implements [`DiscoveryAdapter`] to enumerate every
//! resource owned by one cluster. Deciding what belongs to the cluster is the
//! adapter's job; the core only merges listings into a graph.

use crate::error::DiscoveryError;
use crate::graph::ResourceGraph;
use crate::resource::Resource;
use async_trait::async_trait;
use futures::future::{BoxFuture, try_join_all};
use tracing::debug;

/// One provider listing call
pub type Listing<'a, T> = BoxFuture<'a, Result<Vec<Resource<T>>, DiscoveryError>>;

/// Enumerates a cluster's resources for a single provider
#[async_trait]
pub trait DiscoveryAdapter: Send + Sync {
    /// Payload attached to every discovered resource
    type Payload: Send + Sync;

    /// Provider name, for logging
    fn provider(&self) -> &str;

    /// List every resource belonging to the cluster.
    ///
    /// Any error aborts discovery; a partial listing must never be scheduled.
    async fn discover(&self) -> Result<Vec<Resource<Self::Payload>>, DiscoveryError>;
}

/// Run independent listings concurrently and merge them by key.
///
/// Listings are merged in the order given, so a later listing overwrites an
/// earlier one that reported the same `Type:ID`.
pub async fn collect_listings<T>(
    listings: Vec<Listing<'_, T>>,
) -> Result<ResourceGraph<T>, DiscoveryError> {
    let results = try_join_all(listings).await?;
    let mut graph = ResourceGraph::new();
    for resources in results {
        debug!(count = resources.len(), "Merging listing");
        graph.extend(resources);
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKey;
    use futures::FutureExt;

    fn listing<'a>(resources: Vec<Resource<u32>>) -> Listing<'a, u32> {
        async move { Ok(resources) }.boxed()
    }

    #[tokio::test]
    async fn later_listing_overwrites() {
        let graph = collect_listings(vec![
            listing(vec![
                Resource::new("Disk", "d1", "first", 1),
                Resource::new("Disk", "d2", "d2", 2),
            ]),
            listing(vec![Resource::new("Disk", "d1", "second", 3)]),
        ])
        .await
        .unwrap();

        assert_eq!(graph.len(), 2);
        let d1 = graph.get(&ResourceKey::new("Disk", "d1")).unwrap();
        assert_eq!(d1.name, "second");
        assert_eq!(d1.obj, 3);
    }

    #[tokio::test]
    async fn any_listing_error_aborts() {
        let failing: Listing<'_, u32> =
            async { Err(DiscoveryError::Scope("no zones in region".into())) }.boxed();
        let err = collect_listings(vec![listing(vec![Resource::new("Disk", "d1", "d1", 1)]), failing])
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Scope(_)));
    }
}
