//! Recording deleters
//!
//! [`RecordingDeleter`] implements both [`Deleter`] and [`GroupDeleter`] for
//! any payload. It logs every attempt and succeeds unless a failure has been
//! scripted for the key (or, for group calls, the group key).

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use teardown_core::{DeleteError, Deleter, GroupDeleter, Resource, ResourceKey};

#[derive(Debug, Default)]
struct Script {
    once: HashMap<String, VecDeque<DeleteError>>,
    always: HashMap<String, DeleteError>,
}

impl Script {
    fn next_failure(&mut self, id: &str) -> Option<DeleteError> {
        if let Some(err) = self.always.get(id) {
            return Some(err.clone());
        }
        self.once.get_mut(id).and_then(VecDeque::pop_front)
    }
}

/// One group deleter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCall {
    pub group_key: String,
    pub members: Vec<ResourceKey>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDeleter {
    attempts: Arc<Mutex<Vec<ResourceKey>>>,
    group_calls: Arc<Mutex<Vec<GroupCall>>>,
    script: Arc<Mutex<Script>>,
}

impl RecordingDeleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next attempt on `id` (a resource key or group key) with `err`.
    /// Calling this repeatedly queues further failures.
    pub fn fail_once(&self, id: impl ToString, err: DeleteError) -> &Self {
        self.script
            .lock()
            .unwrap()
            .once
            .entry(id.to_string())
            .or_default()
            .push_back(err);
        self
    }

    /// Fail every attempt on `id` with `err`
    pub fn fail_always(&self, id: impl ToString, err: DeleteError) -> &Self {
        self.script
            .lock()
            .unwrap()
            .always
            .insert(id.to_string(), err);
        self
    }

    /// Keys attempted through [`Deleter`], in call order
    pub fn attempts(&self) -> Vec<ResourceKey> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, key: &ResourceKey) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|k| *k == key)
            .count()
    }

    pub fn group_calls(&self) -> Vec<GroupCall> {
        self.group_calls.lock().unwrap().clone()
    }

    pub fn as_deleter<T: Send + Sync>(&self) -> Arc<dyn Deleter<T>> {
        Arc::new(self.clone())
    }

    pub fn as_group_deleter<T: Send + Sync>(&self) -> Arc<dyn GroupDeleter<T>> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl<T: Send + Sync> Deleter<T> for RecordingDeleter {
    async fn delete(&self, resource: &Resource<T>) -> Result<(), DeleteError> {
        let key = resource.key();
        self.attempts.lock().unwrap().push(key.clone());
        let failure = self.script.lock().unwrap().next_failure(key.as_str());
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T: Send + Sync> GroupDeleter<T> for RecordingDeleter {
    async fn delete_group(
        &self,
        group_key: &str,
        resources: &[&Resource<T>],
    ) -> Result<(), DeleteError> {
        self.group_calls.lock().unwrap().push(GroupCall {
            group_key: group_key.to_string(),
            members: resources.iter().map(|r| r.key()).collect(),
        });
        let failure = self.script.lock().unwrap().next_failure(group_key);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
