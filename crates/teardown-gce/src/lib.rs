//! teardown-gce - Google Compute Engine support for cluster teardown
//!
//! [`GceClusterDiscovery`] finds the compute and Cloud DNS resources created
//! for one cluster and attaches deleters to them, so the result can be handed
//! straight to a [`teardown_core::DeletionScheduler`]. API access goes through
//! the [`GceCloud`] trait.
//!
//! ## Modules
//!
//! - [`discovery`]: Cluster resource discovery
//! - [`delete`]: Compute and DNS deleters, instance dumper
//! - [`cloud`]: API surface used by teardown
//! - [`model`]: API objects
//! - [`names`]: Cluster naming conventions
//! - [`url`]: Compute self-link parsing
//! - [`config`]: Teardown configuration
//! - [`error`]: Error classification

pub mod cloud;
pub mod config;
pub mod delete;
pub mod discovery;
pub mod error;
pub mod kind;
pub mod model;
pub mod names;
pub mod url;

pub use cloud::GceCloud;
pub use config::GceTeardownConfig;
pub use delete::{ComputeDeleter, DnsRecordGroupDeleter, ManagedInstanceDumper};
pub use discovery::GceClusterDiscovery;
pub use error::GceError;
pub use kind::GceResourceKind;
pub use model::GceObject;
pub use names::{ClusterNames, safe_cluster_name, safe_object_name};
pub use url::{GoogleCloudUrl, last_component};
