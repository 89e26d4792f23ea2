//! Resource graph and canonical blocked-by index
//!
//! Blocking relations can be declared from either side: a resource lists what it
//! `blocks`, or what it is `blocked` by. [`BlockingIndex`] folds both views into
//! a single `key -> blockers` map, built once per graph and reused by every
//! eligibility check until the graph is modified with [`ResourceGraph::put`].
//!
//! A blocker only counts while it is *pending*: present in the graph, not done,
//! not shared, and not yet removed by the caller's pass bookkeeping. Dangling
//! references are therefore satisfied.

use crate::resource::{Resource, ResourceKey};
use petgraph::Graph;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// Canonical `key -> blocked-by` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockingIndex {
    blocked_by: HashMap<ResourceKey, BTreeSet<ResourceKey>>,
}

impl BlockingIndex {
    /// Normalize `blocks` and `blocked` declarations. Self-edges are dropped.
    pub fn build<'a, T: 'a>(resources: impl IntoIterator<Item = &'a Resource<T>>) -> Self {
        let mut blocked_by: HashMap<ResourceKey, BTreeSet<ResourceKey>> = HashMap::new();
        for resource in resources {
            let key = resource.key();
            for blocker in &resource.blocked {
                if *blocker != key {
                    blocked_by
                        .entry(key.clone())
                        .or_default()
                        .insert(blocker.clone());
                }
            }
            for blocked in &resource.blocks {
                if *blocked != key {
                    blocked_by
                        .entry(blocked.clone())
                        .or_default()
                        .insert(key.clone());
                }
            }
        }
        Self { blocked_by }
    }

    /// Every declared blocker of `key`, whether or not it still exists
    pub fn blockers(&self, key: &ResourceKey) -> impl Iterator<Item = &ResourceKey> {
        self.blocked_by.get(key).into_iter().flatten()
    }
}

/// A set of resources deleted by one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionGroup {
    /// Set when the members are deleted through a group deleter
    pub group_key: Option<String>,
    /// Sorted member keys
    pub members: Vec<ResourceKey>,
}

impl DeletionGroup {
    pub fn singleton(key: ResourceKey, group_key: Option<String>) -> Self {
        Self {
            group_key,
            members: vec![key],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Discovered resources keyed by `Type:ID`
pub struct ResourceGraph<T> {
    resources: HashMap<ResourceKey, Resource<T>>,
    index: OnceLock<BlockingIndex>,
}

impl<T> Default for ResourceGraph<T> {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            index: OnceLock::new(),
        }
    }
}

impl<T> ResourceGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by key (last writer wins)
    pub fn put(&mut self, resource: Resource<T>) -> Option<Resource<T>> {
        self.index = OnceLock::new();
        self.resources.insert(resource.key(), resource)
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Resource<T>> {
        self.resources.get(key)
    }

    /// Remove an entry. The blocking index stays valid: removed keys simply
    /// stop counting as blockers.
    pub fn remove(&mut self, key: &ResourceKey) -> Option<Resource<T>> {
        self.resources.remove(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Live resources (not done), in no particular order
    pub fn all(&self) -> impl Iterator<Item = &Resource<T>> {
        self.resources.values().filter(|r| !r.done)
    }

    /// Sorted keys of every entry
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.resources.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Drop resources already marked done, returning how many were removed
    pub fn prune_done(&mut self) -> usize {
        let before = self.resources.len();
        self.resources.retain(|_, r| !r.done);
        before - self.resources.len()
    }

    /// Remove and return every shared resource, sorted by key
    pub fn take_shared(&mut self) -> Vec<Resource<T>> {
        let keys: Vec<_> = self
            .resources
            .iter()
            .filter(|(_, r)| r.shared)
            .map(|(k, _)| k.clone())
            .collect();
        let mut shared: Vec<_> = keys
            .iter()
            .filter_map(|k| self.resources.remove(k))
            .collect();
        shared.sort_by_key(|r| r.key());
        shared
    }

    /// Consume the graph, returning every entry sorted by key
    pub fn into_resources(self) -> Vec<Resource<T>> {
        let mut resources: Vec<_> = self.resources.into_values().collect();
        resources.sort_by_key(|r| r.key());
        resources
    }

    pub fn blocking_index(&self) -> &BlockingIndex {
        self.index
            .get_or_init(|| BlockingIndex::build(self.resources.values()))
    }

    /// Whether `key` still has to be deleted before its dependents can go
    pub fn is_pending(&self, key: &ResourceKey, removed: &HashSet<ResourceKey>) -> bool {
        !removed.contains(key)
            && self
                .resources
                .get(key)
                .is_some_and(|r| !r.done && !r.shared)
    }

    /// Blockers of `key` that are still pending
    pub fn pending_blockers(
        &self,
        key: &ResourceKey,
        removed: &HashSet<ResourceKey>,
    ) -> Vec<ResourceKey> {
        self.blocking_index()
            .blockers(key)
            .filter(|b| self.is_pending(b, removed))
            .cloned()
            .collect()
    }

    /// Partition pending resources into deletion groups.
    ///
    /// Resources with a group deleter and a non-empty group key are grouped by
    /// key; everything else is a singleton. Output is sorted by first member.
    pub fn partition(&self, removed: &HashSet<ResourceKey>) -> Vec<DeletionGroup> {
        let mut grouped: BTreeMap<&str, Vec<ResourceKey>> = BTreeMap::new();
        let mut groups = Vec::new();

        for (key, resource) in &self.resources {
            if !self.is_pending(key, removed) {
                continue;
            }
            match (&resource.group_deleter, resource.group_key.as_deref()) {
                (Some(_), Some(group_key)) if !group_key.is_empty() => {
                    grouped.entry(group_key).or_default().push(key.clone());
                }
                (Some(_), group_key) => groups.push(DeletionGroup::singleton(
                    key.clone(),
                    Some(group_key.unwrap_or_default().to_string()),
                )),
                (None, _) => groups.push(DeletionGroup::singleton(key.clone(), None)),
            }
        }

        for (group_key, mut members) in grouped {
            members.sort();
            groups.push(DeletionGroup {
                group_key: Some(group_key.to_string()),
                members,
            });
        }
        groups.sort_by(|a, b| a.members.cmp(&b.members));
        groups
    }

    /// Groups whose members have no pending blockers outside the group
    pub fn eligible_groups(&self, removed: &HashSet<ResourceKey>) -> Vec<DeletionGroup> {
        self.partition(removed)
            .into_iter()
            .filter(|group| self.external_blockers(group, removed).is_empty())
            .collect()
    }

    /// Pending blockers of a group's members, excluding the members themselves
    pub fn external_blockers(
        &self,
        group: &DeletionGroup,
        removed: &HashSet<ResourceKey>,
    ) -> Vec<ResourceKey> {
        let mut blockers: BTreeSet<ResourceKey> = BTreeSet::new();
        for member in &group.members {
            for blocker in self.pending_blockers(member, removed) {
                if !group.members.contains(&blocker) {
                    blockers.insert(blocker);
                }
            }
        }
        blockers.into_iter().collect()
    }

    /// Find a blocking cycle among pending resources.
    ///
    /// Returns the sorted keys of the lexicographically smallest strongly
    /// connected component with more than one member.
    pub fn find_cycle(&self) -> Option<Vec<ResourceKey>> {
        let removed = HashSet::new();
        let mut graph: Graph<ResourceKey, ()> = Graph::new();
        let mut nodes: HashMap<&ResourceKey, NodeIndex> = HashMap::new();

        for key in self.resources.keys() {
            if self.is_pending(key, &removed) {
                nodes.insert(key, graph.add_node(key.clone()));
            }
        }
        for (key, &node) in &nodes {
            for blocker in self.pending_blockers(key, &removed) {
                if let Some(&from) = nodes.get(&blocker) {
                    graph.add_edge(from, node, ());
                }
            }
        }

        tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut keys: Vec<_> = scc.into_iter().map(|n| graph[n].clone()).collect();
                keys.sort();
                keys
            })
            .min()
    }
}

impl<T> fmt::Debug for ResourceGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

impl<T> Extend<Resource<T>> for ResourceGraph<T> {
    fn extend<I: IntoIterator<Item = Resource<T>>>(&mut self, iter: I) {
        for resource in iter {
            self.put(resource);
        }
    }
}

impl<T> FromIterator<Resource<T>> for ResourceGraph<T> {
    fn from_iter<I: IntoIterator<Item = Resource<T>>>(iter: I) -> Self {
        let mut graph = Self::new();
        graph.extend(iter);
        graph
    }
}
