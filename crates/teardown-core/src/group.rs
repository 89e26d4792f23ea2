//! Deletion dispatch for a single [`DeletionGroup`]
//!
//! A group with a group key goes to the first member's [`GroupDeleter`] in one
//! call and its outcome applies to every member. A group without one is a
//! single resource handed to its own [`Deleter`].
//!
//! [`GroupDeleter`]: crate::resource::GroupDeleter
//! [`Deleter`]: crate::resource::Deleter

use crate::error::DeleteError;
use crate::graph::{DeletionGroup, ResourceGraph};
use crate::resource::Resource;
use tracing::{debug, info};

/// Delete every member of `group`.
///
/// Shared members are never handed to a callback, and a not-found response
/// counts as success.
pub async fn delete_group<T>(
    graph: &ResourceGraph<T>,
    group: &DeletionGroup,
) -> Result<(), DeleteError> {
    let members: Vec<&Resource<T>> = group
        .members
        .iter()
        .filter_map(|key| graph.get(key))
        .filter(|r| !r.shared)
        .collect();

    let Some(first) = members.first() else {
        return Ok(());
    };

    let result = match &group.group_key {
        Some(group_key) => match &first.group_deleter {
            Some(deleter) => {
                info!(
                    group = %group_key,
                    members = members.len(),
                    "Deleting resource group"
                );
                deleter.delete_group(group_key, &members).await
            }
            None => Err(DeleteError::NoDeleter { key: first.key() }),
        },
        None => match &first.deleter {
            Some(deleter) => {
                info!(resource = %first.key(), name = %first.name, "Deleting resource");
                deleter.delete(first).await
            }
            None => Err(DeleteError::NoDeleter { key: first.key() }),
        },
    };

    match result {
        Err(e) if e.is_not_found() => {
            debug!(resource = %first.key(), error = %e, "Resource already gone");
            Ok(())
        }
        other => other,
    }
}
