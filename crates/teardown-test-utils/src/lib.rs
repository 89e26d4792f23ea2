//! Shared test utilities for the teardown crates
//!
//! ## Modules
//!
//! - [`deleters`]: Recording deleters with scripted failures
//! - [`graphs`]: Graph builders and proptest strategies
//! - [`logging`]: Test tracing subscriber

pub mod deleters;
pub mod graphs;
pub mod logging;

// Re-export commonly used items
pub use deleters::RecordingDeleter;
pub use graphs::{Dag, acyclic_graph, arb_dag, key, node_key, resource};
pub use logging::init_tracing;
