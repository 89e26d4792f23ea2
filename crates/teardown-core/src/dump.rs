//! Provider-neutral resource summaries
//!
//! Dry runs and dumps never touch the cloud: each resource's [`Dumper`] (or the
//! default `{type, id, name}` record when it has none) writes into a shared
//! [`DumpOperation`].
//!
//! [`Dumper`]: crate::resource::Dumper

use crate::error::DumpError;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Accumulated summaries of every dumped resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dump {
    pub resources: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceSummary>,
}

/// A compute instance, recorded in addition to its resource record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Sink handed to [`Dumper::dump`](crate::resource::Dumper::dump)
#[derive(Debug, Default)]
pub struct DumpOperation {
    dump: Dump,
}

impl DumpOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, record: Value) {
        self.dump.resources.push(record);
    }

    pub fn add_instance(&mut self, instance: InstanceSummary) {
        self.dump.instances.push(instance);
    }

    pub fn dump(&self) -> &Dump {
        &self.dump
    }

    pub fn into_dump(self) -> Dump {
        self.dump
    }
}

/// The record used for resources without a dumper
pub fn default_record<T>(resource: &Resource<T>) -> Value {
    json!({
        "type": resource.resource_type,
        "id": resource.id,
        "name": resource.name,
    })
}

/// Dump one resource through its dumper, falling back to [`default_record`]
pub fn dump_resource<T>(resource: &Resource<T>, op: &mut DumpOperation) -> Result<(), DumpError> {
    match &resource.dumper {
        Some(dumper) => dumper.dump(resource, op),
        None => {
            op.add_resource(default_record(resource));
            Ok(())
        }
    }
}
