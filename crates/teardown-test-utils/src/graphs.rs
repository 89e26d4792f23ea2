//! Graph builders and proptest strategies

use proptest::prelude::*;
use std::sync::Arc;
use teardown_core::{Deleter, Resource, ResourceGraph, ResourceKey};

/// Parse a `Type:ID` key, panicking on malformed input
pub fn key(s: &str) -> ResourceKey {
    ResourceKey::parse(s).unwrap_or_else(|| panic!("malformed resource key: {s}"))
}

/// Resource with `()` payload whose name equals its ID
pub fn resource(resource_type: &str, id: &str) -> Resource<()> {
    Resource::new(resource_type, id, id, ())
}

pub fn node_key(i: usize) -> ResourceKey {
    ResourceKey::new("Node", &format!("n{i}"))
}

/// A random acyclic blocking graph.
///
/// Each edge `(blocker, blocked, declared_by_blocker)` has `blocker < blocked`,
/// and is declared either as the blocker's `blocks` entry or as the blocked
/// resource's `blocked` entry.
#[derive(Debug, Clone)]
pub struct Dag {
    pub nodes: usize,
    pub edges: Vec<(usize, usize, bool)>,
}

impl Dag {
    /// Blockers of node `i`
    pub fn blockers_of(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(_, blocked, _)| *blocked == i)
            .map(|(blocker, _, _)| *blocker)
    }
}

pub fn arb_dag(max_nodes: usize) -> impl Strategy<Value = Dag> {
    (1..=max_nodes).prop_flat_map(|nodes| {
        proptest::collection::vec((0..nodes, 0..nodes, any::<bool>()), 0..=nodes * 2).prop_map(
            move |raw| Dag {
                nodes,
                edges: raw
                    .into_iter()
                    .filter(|(a, b, _)| a != b)
                    .map(|(a, b, by_blocker)| (a.min(b), a.max(b), by_blocker))
                    .collect(),
            },
        )
    })
}

/// Build the graph described by `dag`, every node deleted by `deleter`
pub fn acyclic_graph(dag: &Dag, deleter: Arc<dyn Deleter<()>>) -> ResourceGraph<()> {
    let mut resources: Vec<Resource<()>> = (0..dag.nodes)
        .map(|i| Resource::new("Node", format!("n{i}"), format!("n{i}"), ()).with_deleter(deleter.clone()))
        .collect();

    for &(blocker, blocked, by_blocker) in &dag.edges {
        if by_blocker {
            resources[blocker].blocks.push(node_key(blocked));
        } else {
            resources[blocked].blocked.push(node_key(blocker));
        }
    }

    resources.into_iter().collect()
}
