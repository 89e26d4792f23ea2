//! Resource model and provider callbacks
//!
//! A [`Resource`] is a single discovered cloud object together with the
//! blocking relationships that constrain when it may be deleted. The provider
//! payload is carried as the type parameter `T`; the core never inspects it and
//! only hands it back to the provider's own callbacks.

use crate::dump::DumpOperation;
use crate::error::{DeleteError, DumpError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Graph key of a resource, formatted as `Type:ID`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Build a key from a resource type and provider ID
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self(format!("{resource_type}:{id}"))
    }

    /// Parse a `Type:ID` string. The type is everything before the first `:`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((t, id)) if !t.is_empty() && !id.is_empty() => Some(Self(s.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource type portion of the key
    pub fn resource_type(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(t, _)| t)
    }

    /// Provider ID portion of the key
    pub fn id(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, id)| id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deletes a single resource.
///
/// Implementations must map the provider's "not found" response to `Ok(())`
/// (or [`DeleteError::NotFound`], which the scheduler also treats as success)
/// and must wait for asynchronous provider operations to finish before
/// returning.
#[async_trait]
pub trait Deleter<T>: Send + Sync {
    async fn delete(&self, resource: &Resource<T>) -> Result<(), DeleteError>;
}

/// Deletes every live resource sharing one group key in a single provider call.
///
/// The outcome applies to all members: either every member is deleted or none is.
#[async_trait]
pub trait GroupDeleter<T>: Send + Sync {
    async fn delete_group(
        &self,
        group_key: &str,
        resources: &[&Resource<T>],
    ) -> Result<(), DeleteError>;
}

/// Produces a provider-neutral summary of a resource for dry runs and dumps.
pub trait Dumper<T>: Send + Sync {
    fn dump(&self, resource: &Resource<T>, op: &mut DumpOperation) -> Result<(), DumpError>;
}

/// A discovered cloud resource
pub struct Resource<T> {
    /// Type tag, e.g. "Instance" or "DNSRecord"
    pub resource_type: String,
    /// Provider-unique identifier (often `zone/name` or `name`)
    pub id: String,
    /// Display name, not necessarily unique
    pub name: String,
    /// Resources that cannot be deleted while this one exists
    pub blocks: Vec<ResourceKey>,
    /// Resources that must be gone before this one can be deleted
    pub blocked: Vec<ResourceKey>,
    /// Deleted, or known not to exist
    pub done: bool,
    /// Discovered but owned elsewhere; never deleted
    pub shared: bool,
    /// Resources with the same key and a group deleter are deleted together
    pub group_key: Option<String>,
    pub deleter: Option<Arc<dyn Deleter<T>>>,
    pub group_deleter: Option<Arc<dyn GroupDeleter<T>>>,
    pub dumper: Option<Arc<dyn Dumper<T>>>,
    /// Provider payload handed back to the callbacks
    pub obj: T,
}

impl<T> Resource<T> {
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        obj: T,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            name: name.into(),
            blocks: Vec::new(),
            blocked: Vec::new(),
            done: false,
            shared: false,
            group_key: None,
            deleter: None,
            group_deleter: None,
            dumper: None,
            obj,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.resource_type, &self.id)
    }

    pub fn with_deleter(mut self, deleter: Arc<dyn Deleter<T>>) -> Self {
        self.deleter = Some(deleter);
        self
    }

    /// Delete this resource together with every other resource sharing `group_key`
    pub fn with_group_deleter(
        mut self,
        group_key: impl Into<String>,
        deleter: Arc<dyn GroupDeleter<T>>,
    ) -> Self {
        self.group_key = Some(group_key.into());
        self.group_deleter = Some(deleter);
        self
    }

    pub fn with_dumper(mut self, dumper: Arc<dyn Dumper<T>>) -> Self {
        self.dumper = Some(dumper);
        self
    }

    /// Declare that `key` cannot be deleted while this resource exists
    pub fn blocks(mut self, key: ResourceKey) -> Self {
        self.blocks.push(key);
        self
    }

    /// Declare that `key` must be gone before this resource can be deleted
    pub fn blocked_by(mut self, key: ResourceKey) -> Self {
        self.blocked.push(key);
        self
    }

    /// Mark as shared so the scheduler never deletes it
    pub fn mark_shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Mark as already deleted
    pub fn mark_done(mut self) -> Self {
        self.done = true;
        self
    }

    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            key: self.key(),
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            group_key: self.group_key.clone(),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key())
            .field("name", &self.name)
            .field("blocks", &self.blocks)
            .field("blocked", &self.blocked)
            .field("done", &self.done)
            .field("shared", &self.shared)
            .field("group_key", &self.group_key)
            .finish_non_exhaustive()
    }
}

/// Payload-free description of a resource, used in plans and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub key: ResourceKey,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}
