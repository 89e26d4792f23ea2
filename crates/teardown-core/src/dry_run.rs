//! Non-destructive deletion plan
//!
//! Walks the graph with the same eligibility rule as the scheduler, assuming
//! every attempt succeeds, and records which resources each pass would
//! delete. No callback other than the dumper is invoked and the graph is not
//! modified.

use crate::dump::{Dump, DumpOperation, dump_resource};
use crate::error::DumpError;
use crate::graph::ResourceGraph;
use crate::resource::{ResourceKey, ResourceSummary};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Resources one pass would delete, per deletion group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPass {
    pub number: u32,
    pub groups: Vec<PlannedGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    pub resources: Vec<ResourceSummary>,
}

/// A resource that would never become eligible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedResource {
    pub resource: ResourceSummary,
    pub blocked_by: Vec<ResourceKey>,
}

/// Pass-by-pass plan produced by [`DryRunReporter::plan`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub passes: Vec<PlannedPass>,
    /// Resources left over when no further pass would make progress
    pub blocked: Vec<BlockedResource>,
    pub shared: Vec<ResourceSummary>,
    pub dump: Dump,
}

impl DeletionPlan {
    /// Number of resources the plan would delete
    pub fn deletions(&self) -> usize {
        self.passes
            .iter()
            .flat_map(|p| &p.groups)
            .map(|g| g.resources.len())
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Pass"),
                Cell::new("Type"),
                Cell::new("ID"),
                Cell::new("Name"),
                Cell::new("Group"),
            ]);

        for pass in &self.passes {
            for group in &pass.groups {
                for resource in &group.resources {
                    table.add_row(vec![
                        Cell::new(pass.number),
                        Cell::new(&resource.resource_type),
                        Cell::new(&resource.id),
                        Cell::new(&resource.name),
                        Cell::new(group.group_key.as_deref().unwrap_or("-")),
                    ]);
                }
            }
        }
        for blocked in &self.blocked {
            let by: Vec<_> = blocked.blocked_by.iter().map(ResourceKey::as_str).collect();
            table.add_row(vec![
                Cell::new("blocked"),
                Cell::new(&blocked.resource.resource_type),
                Cell::new(&blocked.resource.id),
                Cell::new(&blocked.resource.name),
                Cell::new(by.join(", ")),
            ]);
        }
        for shared in &self.shared {
            table.add_row(vec![
                Cell::new("shared"),
                Cell::new(&shared.resource_type),
                Cell::new(&shared.id),
                Cell::new(&shared.name),
                Cell::new("-"),
            ]);
        }

        table.to_string()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Produces a [`DeletionPlan`] instead of deleting
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunReporter;

impl DryRunReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn plan<T>(&self, graph: &ResourceGraph<T>) -> Result<DeletionPlan, DumpError> {
        let mut removed: HashSet<ResourceKey> = HashSet::new();
        let mut op = DumpOperation::new();
        let mut plan = DeletionPlan::default();

        loop {
            let eligible = graph.eligible_groups(&removed);
            if eligible.is_empty() {
                break;
            }
            let number = plan.passes.len() as u32 + 1;
            let mut groups = Vec::with_capacity(eligible.len());

            for group in eligible {
                let mut resources = Vec::with_capacity(group.len());
                for key in &group.members {
                    let Some(resource) = graph.get(key) else {
                        continue;
                    };
                    info!(
                        pass = number,
                        resource = %key,
                        name = %resource.name,
                        "[DRY RUN] Would delete"
                    );
                    dump_resource(resource, &mut op)?;
                    resources.push(resource.summary());
                }
                removed.extend(group.members);
                groups.push(PlannedGroup {
                    group_key: group.group_key,
                    resources,
                });
            }
            plan.passes.push(PlannedPass { number, groups });
        }

        for key in graph.keys() {
            let Some(resource) = graph.get(&key) else {
                continue;
            };
            if resource.shared {
                plan.shared.push(resource.summary());
            } else if graph.is_pending(&key, &removed) {
                dump_resource(resource, &mut op)?;
                plan.blocked.push(BlockedResource {
                    resource: resource.summary(),
                    blocked_by: graph.pending_blockers(&key, &removed),
                });
            }
        }

        plan.dump = op.into_dump();
        Ok(plan)
    }
}
