//! Deleters and dumpers attached to discovered GCE resources
//!
//! Compute resources are deleted through their self link and the returned
//! operation is polled until it finishes. DNS records in one managed zone are
//! removed together by a single change set.

use crate::cloud::GceCloud;
use crate::config::GceTeardownConfig;
use crate::error::{GceError, classify_operation_error};
use crate::model::{DnsChange, GceObject, Operation};
use crate::url::{GoogleCloudUrl, last_component};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::json;
use std::sync::Arc;
use teardown_core::wait::{WaitConfig, WaitError, wait_for};
use teardown_core::{
    DeleteError, Deleter, DumpError, DumpOperation, Dumper, GroupDeleter, InstanceSummary,
    Resource,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Deletes any compute resource by its self link
pub struct ComputeDeleter {
    cloud: Arc<dyn GceCloud>,
    wait: WaitConfig,
    throttle: ExponentialBuilder,
    cancel: Option<CancellationToken>,
}

impl ComputeDeleter {
    pub fn new(cloud: Arc<dyn GceCloud>, config: &GceTeardownConfig) -> Self {
        Self {
            cloud,
            wait: config.operation_wait(),
            throttle: config.throttle_backoff(),
            cancel: None,
        }
    }

    /// Abandon operation polling when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Issue the delete call, retrying while the API throttles us
    async fn start_delete(&self, url: &GoogleCloudUrl, link: &str) -> Result<Operation, GceError> {
        let cloud = &self.cloud;
        (|| async move { cloud.delete(url).await })
            .retry(self.throttle)
            .when(GceError::is_throttled)
            .notify(|e, dur| {
                warn!(
                    url = %link,
                    delay = ?dur,
                    error = %e,
                    "GCE rate limited, backing off..."
                );
            })
            .await
    }

    /// Poll `op` until it is done, surfacing the operation's own error
    async fn wait_for_operation(&self, op: &Operation, link: &str) -> Result<(), DeleteError> {
        let cloud = &self.cloud;
        let check = || async move {
            let current = cloud.get_operation(op).await?;
            if !current.is_done() {
                return Ok(false);
            }
            match current.error.and_then(|e| e.errors.into_iter().next()) {
                Some(detail) => Err(classify_operation_error(&detail.code, &detail.message)),
                None => Ok(true),
            }
        };

        match wait_for(&self.wait, self.cancel.as_ref(), check, link).await {
            Ok(()) => Ok(()),
            Err(WaitError::Check(e)) if e.is_not_found() => {
                debug!(url = %link, "Operation reports resource gone");
                Ok(())
            }
            Err(WaitError::Check(e)) => Err(e.into()),
            Err(WaitError::Timeout { name, .. }) => Err(DeleteError::Timeout(name)),
            Err(e @ WaitError::Cancelled(_)) => Err(DeleteError::provider(e.to_string())),
        }
    }
}

#[async_trait]
impl Deleter<GceObject> for ComputeDeleter {
    async fn delete(&self, resource: &Resource<GceObject>) -> Result<(), DeleteError> {
        let Some(link) = resource.obj.self_link() else {
            return Err(GceError::UnexpectedPayload(resource.key().to_string()).into());
        };
        let url = GoogleCloudUrl::parse(link)?;

        info!(kind = %resource.obj.kind(), url = %link, "Deleting GCE resource");
        let op = match self.start_delete(&url, link).await {
            Ok(op) => op,
            Err(e) if e.is_not_found() => {
                info!(url = %link, "Resource not found, assuming deleted");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.wait_for_operation(&op, link).await
    }
}

/// Removes every DNS record of one managed zone with a single change set.
///
/// The group key is the managed zone name.
pub struct DnsRecordGroupDeleter {
    cloud: Arc<dyn GceCloud>,
}

impl DnsRecordGroupDeleter {
    pub fn new(cloud: Arc<dyn GceCloud>) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl GroupDeleter<GceObject> for DnsRecordGroupDeleter {
    async fn delete_group(
        &self,
        group_key: &str,
        resources: &[&Resource<GceObject>],
    ) -> Result<(), DeleteError> {
        let records = resources
            .iter()
            .map(|r| match &r.obj {
                GceObject::DnsRecord(record) => Ok(record.clone()),
                _ => Err(GceError::UnexpectedPayload(r.key().to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(zone = %group_key, count = records.len(), "Deleting DNS records");
        self.cloud
            .create_dns_change(group_key, &DnsChange::deletions(records))
            .await?;
        Ok(())
    }
}

/// Records managed instances in dumps, including an instance summary
pub struct ManagedInstanceDumper;

impl Dumper<GceObject> for ManagedInstanceDumper {
    fn dump(&self, resource: &Resource<GceObject>, op: &mut DumpOperation) -> Result<(), DumpError> {
        let GceObject::Instance(instance) = &resource.obj else {
            return Err(DumpError::new(resource.key(), "not a managed instance"));
        };
        let raw = serde_json::to_value(instance)
            .map_err(|e| DumpError::new(resource.key(), e.to_string()))?;

        op.add_resource(json!({
            "type": resource.resource_type,
            "id": resource.id,
            "name": resource.name,
            "raw": raw,
        }));
        op.add_instance(InstanceSummary {
            name: last_component(&instance.instance).to_string(),
            zone: GoogleCloudUrl::parse(&instance.instance)
                .ok()
                .and_then(|u| u.zone),
            status: instance.instance_status.clone(),
            roles: Vec::new(),
        });
        Ok(())
    }
}
