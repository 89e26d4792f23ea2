//! Outcome reports
//!
//! [`TeardownReport`] is the payload-free view of a [`TeardownOutcome`]: every
//! resource still present with the reason it remains, plus per-pass totals.

use crate::resource::{ResourceKey, ResourceSummary};
use crate::scheduler::{OutcomeStatus, PassSummary, ResidualReason, TeardownOutcome};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::{Deserialize, Serialize};

/// A resource left behind by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingResource {
    #[serde(flatten)]
    pub resource: ResourceSummary,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub status: OutcomeStatus,
    pub deleted: usize,
    pub shared: usize,
    pub passes: Vec<PassSummary>,
    pub remaining: Vec<RemainingResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<ResourceKey>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TeardownReport {
    pub fn from_outcome<T>(outcome: &TeardownOutcome<T>) -> Self {
        let remaining = outcome
            .residual
            .keys()
            .into_iter()
            .filter_map(|key| outcome.residual.get(&key))
            .map(|resource| {
                let key = resource.key();
                let reason = outcome
                    .errors
                    .get(&key)
                    .map_or_else(|| ResidualReason::NotAttempted.to_string(), |r| r.to_string());
                RemainingResource {
                    resource: resource.summary(),
                    reason,
                }
            })
            .collect();

        Self {
            status: outcome.status,
            deleted: outcome.deleted.len(),
            shared: outcome.shared.len(),
            passes: outcome.passes.clone(),
            remaining,
            cycle: outcome.cycle.clone(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
        }
    }

    /// Table of resources still present, empty string when nothing remains
    pub fn render_table(&self) -> String {
        if self.remaining.is_empty() {
            return String::new();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Type"),
                Cell::new("ID"),
                Cell::new("Name"),
                Cell::new("Reason"),
            ]);

        for remaining in &self.remaining {
            table.add_row(vec![
                Cell::new(&remaining.resource.resource_type),
                Cell::new(&remaining.resource.id),
                Cell::new(&remaining.resource.name),
                Cell::new(&remaining.reason),
            ]);
        }

        table.to_string()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<T> TeardownOutcome<T> {
    pub fn report(&self) -> TeardownReport {
        TeardownReport::from_outcome(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::graph::ResourceGraph;
    use crate::resource::Resource;
    use crate::scheduler::DeletionScheduler;

    #[tokio::test]
    async fn report_lists_blocked_resources() {
        // no deleters: the disk fails, the network waits on it
        let graph: ResourceGraph<()> = [
            Resource::new("Disk", "d1", "data", ()),
            Resource::new("Network", "n1", "net", ())
                .blocked_by(ResourceKey::new("Disk", "d1")),
        ]
        .into_iter()
        .collect();

        let outcome = DeletionScheduler::new(SchedulerConfig::default())
            .run(graph)
            .await;
        let report = outcome.report();

        assert_eq!(report.status, OutcomeStatus::Stalled);
        assert_eq!(report.remaining.len(), 2);
        assert_eq!(report.remaining[0].reason, "failed: no deleter registered for Disk:d1");
        assert_eq!(report.remaining[1].reason, "blocked by Disk:d1");

        let table = report.render_table();
        assert!(table.contains("blocked by Disk:d1"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "stalled");
        assert_eq!(json["remaining"][0]["type"], "Disk");
    }

    #[tokio::test]
    async fn completed_report_has_no_table() {
        let outcome = DeletionScheduler::new(SchedulerConfig::default())
            .run(ResourceGraph::<()>::new())
            .await;
        let report = outcome.report();
        assert_eq!(report.status, OutcomeStatus::Completed);
        assert!(report.render_table().is_empty());
    }
}
