//! teardown-core - Dependency-ordered deletion of cluster resources
//!
//! This crate holds the cloud-agnostic half of cluster teardown: the resource
//! model, the blocking graph, and the pass-based scheduler that deletes every
//! resource whose blockers are already gone. It never talks to a cloud API
//! directly; provider crates implement [`DiscoveryAdapter`] and attach
//! [`Deleter`] / [`GroupDeleter`] / [`Dumper`] callbacks to each resource.
//!
//! ## Modules
//!
//! - [`resource`]: Resource model, graph keys and provider callbacks
//! - [`graph`]: Resource graph and canonical blocked-by index
//! - [`group`]: Grouped deletion (one provider call per shared group key)
//! - [`scheduler`]: Fixed-point deletion scheduler
//! - [`dry_run`]: Non-destructive deletion plan
//! - [`discovery`]: Discovery adapter contract and listing aggregation
//! - [`dump`]: Provider-neutral resource summaries
//! - [`report`]: Outcome reports (table and JSON)
//! - [`config`]: Scheduler configuration
//! - [`wait`]: Backoff waiting with cancellation
//! - [`error`]: Error types

pub mod config;
pub mod defaults;
pub mod discovery;
pub mod dry_run;
pub mod dump;
pub mod error;
pub mod graph;
pub mod group;
pub mod report;
pub mod resource;
pub mod scheduler;
pub mod wait;

// Re-export commonly used types
pub use config::SchedulerConfig;
pub use discovery::{DiscoveryAdapter, Listing, collect_listings};
pub use dry_run::{DeletionPlan, DryRunReporter};
pub use dump::{Dump, DumpOperation, InstanceSummary};
pub use error::{ConfigError, DeleteError, DiscoveryError, DumpError, TeardownError};
pub use graph::{BlockingIndex, DeletionGroup, ResourceGraph};
pub use report::TeardownReport;
pub use resource::{Deleter, Dumper, GroupDeleter, Resource, ResourceKey, ResourceSummary};
pub use scheduler::{DeletionScheduler, OutcomeStatus, PassSummary, ResidualReason, TeardownOutcome};
