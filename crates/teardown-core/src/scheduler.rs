//! Fixed-point deletion scheduler
//!
//! Each pass computes the groups whose blockers are all gone, attempts every one
//! of them concurrently (bounded by `concurrency`), waits for all attempts to
//! finish, and removes what was deleted. Passes repeat while they make
//! progress. A pass that deletes nothing ends the run as stalled, after up to
//! `stall_retries` extra rounds separated by exponential backoff.
//!
//! The scheduler owns the graph for the whole run and only ever reads it while
//! a pass is in flight; all mutation happens between passes.

use crate::config::SchedulerConfig;
use crate::discovery::DiscoveryAdapter;
use crate::error::{DeleteError, TeardownError};
use crate::graph::{DeletionGroup, ResourceGraph};
use crate::group::delete_group;
use crate::resource::{ResourceKey, ResourceSummary};
use crate::wait::sleep_or_cancelled;
use backon::BackoffBuilder;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Every resource was deleted
    Completed,
    /// A pass made no progress and resources remain
    Stalled,
    /// Cancelled or past the deadline
    Cancelled,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Completed => write!(f, "completed"),
            OutcomeStatus::Stalled => write!(f, "stalled"),
            OutcomeStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why a resource is still in the residual graph
#[derive(Debug, Clone)]
pub enum ResidualReason {
    /// The last deletion attempt failed
    Failed(DeleteError),
    /// Never eligible: these blockers are still present
    Blocked { by: Vec<ResourceKey> },
    /// Eligible, but the run stopped before it was attempted
    NotAttempted,
}

impl fmt::Display for ResidualReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidualReason::Failed(e) => write!(f, "failed: {e}"),
            ResidualReason::Blocked { by } => {
                let keys: Vec<_> = by.iter().map(ResourceKey::as_str).collect();
                write!(f, "blocked by {}", keys.join(", "))
            }
            ResidualReason::NotAttempted => write!(f, "not attempted"),
        }
    }
}

/// What happened in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub number: u32,
    /// Eligible groups at the start of the pass
    pub eligible: usize,
    pub deleted: Vec<ResourceKey>,
    pub failed: Vec<ResourceKey>,
    /// Eligible but not started because the run was stopping
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ResourceKey>,
}

impl PassSummary {
    pub fn made_progress(&self) -> bool {
        !self.deleted.is_empty()
    }
}

/// Result of a scheduler run
#[derive(Debug)]
pub struct TeardownOutcome<T> {
    pub status: OutcomeStatus,
    /// Resources still present; empty on completion
    pub residual: ResourceGraph<T>,
    /// Reason for every key in `residual`
    pub errors: BTreeMap<ResourceKey, ResidualReason>,
    pub passes: Vec<PassSummary>,
    pub deleted: Vec<ResourceSummary>,
    /// Discovered but never deleted because they are owned elsewhere
    pub shared: Vec<ResourceSummary>,
    /// A blocking cycle among residual resources, when stalled
    pub cycle: Option<Vec<ResourceKey>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<T> TeardownOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }

    pub fn remaining(&self) -> usize {
        self.residual.len()
    }

    /// Convert a stalled or cancelled run into an error
    pub fn into_result(self) -> Result<Self, TeardownError> {
        match self.status {
            OutcomeStatus::Completed => Ok(self),
            OutcomeStatus::Stalled => Err(TeardownError::Stalled {
                remaining: self.remaining(),
                cycle: self.cycle,
            }),
            OutcomeStatus::Cancelled => Err(TeardownError::Cancelled {
                remaining: self.remaining(),
            }),
        }
    }
}

enum Attempt {
    Finished(Result<(), DeleteError>),
    Skipped,
}

/// Pass-based deletion scheduler
#[derive(Debug, Clone)]
pub struct DeletionScheduler {
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl DeletionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop starting new attempts once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Discover a cluster's resources and delete them
    pub async fn teardown<A>(
        &self,
        adapter: &A,
    ) -> Result<TeardownOutcome<A::Payload>, TeardownError>
    where
        A: DiscoveryAdapter + ?Sized,
    {
        info!(provider = adapter.provider(), "Discovering cluster resources");
        let resources = adapter.discover().await?;
        info!(count = resources.len(), "Discovery complete");
        Ok(self.run(resources.into_iter().collect()).await)
    }

    /// Delete everything in `graph`, returning what could not be deleted
    pub async fn run<T>(&self, mut graph: ResourceGraph<T>) -> TeardownOutcome<T> {
        let started_at = Utc::now();
        let deadline = self.config.timeout().map(|t| Instant::now() + t);

        graph.prune_done();
        let shared: Vec<ResourceSummary> =
            graph.take_shared().iter().map(|r| r.summary()).collect();
        for s in &shared {
            debug!(resource = %s.key, "Skipping shared resource");
        }

        let mut failures: BTreeMap<ResourceKey, DeleteError> = BTreeMap::new();
        let mut passes: Vec<PassSummary> = Vec::new();
        let mut deleted: Vec<ResourceSummary> = Vec::new();
        let mut stall_delays = self.config.stall_backoff().build();

        let status = loop {
            if graph.is_empty() {
                break OutcomeStatus::Completed;
            }
            if self.should_stop(deadline) {
                break OutcomeStatus::Cancelled;
            }

            let number = passes.len() as u32 + 1;
            let summary = self
                .run_pass(&mut graph, number, deadline, &mut failures, &mut deleted)
                .instrument(info_span!("pass", number))
                .await;
            let progressed = summary.made_progress();
            let nothing_eligible = summary.eligible == 0;
            passes.push(summary);

            if graph.is_empty() {
                break OutcomeStatus::Completed;
            }
            if progressed {
                stall_delays = self.config.stall_backoff().build();
                continue;
            }
            if self.should_stop(deadline) {
                break OutcomeStatus::Cancelled;
            }
            if nothing_eligible {
                warn!(remaining = graph.len(), "No resources eligible for deletion");
                break OutcomeStatus::Stalled;
            }

            match stall_delays.next() {
                Some(delay) => {
                    let delay = match deadline {
                        Some(d) => delay.min(d.saturating_duration_since(Instant::now())),
                        None => delay,
                    };
                    warn!(
                        remaining = graph.len(),
                        delay_secs = delay.as_secs(),
                        "Not making progress deleting resources, retrying"
                    );
                    if !sleep_or_cancelled(delay, Some(&self.cancel)).await {
                        break OutcomeStatus::Cancelled;
                    }
                }
                None => {
                    warn!(remaining = graph.len(), "Not making progress deleting resources");
                    break OutcomeStatus::Stalled;
                }
            }
        };

        let no_removals = HashSet::new();
        let errors: BTreeMap<ResourceKey, ResidualReason> = graph
            .keys()
            .into_iter()
            .map(|key| {
                let reason = match failures.remove(&key) {
                    Some(e) => ResidualReason::Failed(e),
                    None => {
                        let by = graph.pending_blockers(&key, &no_removals);
                        if by.is_empty() {
                            ResidualReason::NotAttempted
                        } else {
                            ResidualReason::Blocked { by }
                        }
                    }
                };
                (key, reason)
            })
            .collect();

        let cycle = match status {
            OutcomeStatus::Stalled => graph.find_cycle(),
            _ => None,
        };
        if let Some(cycle) = &cycle {
            warn!(cycle = ?cycle, "Blocking cycle among remaining resources");
        }

        info!(
            status = %status,
            passes = passes.len(),
            deleted = deleted.len(),
            remaining = graph.len(),
            "Teardown finished"
        );

        TeardownOutcome {
            status,
            residual: graph,
            errors,
            passes,
            deleted,
            shared,
            cycle,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        deadline.is_some_and(|d| Instant::now() >= d)
    }

    async fn run_pass<T>(
        &self,
        graph: &mut ResourceGraph<T>,
        number: u32,
        deadline: Option<Instant>,
        failures: &mut BTreeMap<ResourceKey, DeleteError>,
        deleted: &mut Vec<ResourceSummary>,
    ) -> PassSummary {
        let eligible = graph.eligible_groups(&HashSet::new());
        info!(
            eligible = eligible.len(),
            remaining = graph.len(),
            "Starting deletion pass"
        );

        let view: &ResourceGraph<T> = graph;
        let results: Vec<(DeletionGroup, Attempt)> = stream::iter(eligible.iter().cloned())
            .map(|group| async move {
                if self.should_stop(deadline) {
                    return (group, Attempt::Skipped);
                }
                let result = delete_group(view, &group).await;
                (group, Attempt::Finished(result))
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut summary = PassSummary {
            number,
            eligible: eligible.len(),
            ..Default::default()
        };

        for (group, attempt) in results {
            match attempt {
                Attempt::Finished(Ok(())) => {
                    for key in &group.members {
                        if let Some(mut resource) = graph.remove(key) {
                            resource.done = true;
                            info!(resource = %key, "Deleted resource");
                            deleted.push(resource.summary());
                        }
                        failures.remove(key);
                        summary.deleted.push(key.clone());
                    }
                }
                Attempt::Finished(Err(e)) => {
                    if e.is_dependency_violation() {
                        info!(
                            resource = %group.members[0],
                            "Resource still has dependencies, will retry"
                        );
                    } else {
                        warn!(resource = %group.members[0], error = %e, "Failed to delete resource");
                    }
                    for key in &group.members {
                        failures.insert(key.clone(), e.clone());
                        summary.failed.push(key.clone());
                    }
                }
                Attempt::Skipped => summary.skipped.extend(group.members),
            }
        }

        summary.deleted.sort();
        summary.failed.sort();
        summary.skipped.sort();
        summary
    }
}
