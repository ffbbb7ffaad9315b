use std::collections::HashMap;
use std::future::Future;

use pulse_core::PartitionHandle;
use tokio::sync::Mutex;

use crate::DbError;

/// Map from derived partition name to its handle.
///
/// Owned by a store instance. Creation-if-absent runs entirely under one
/// lock, so concurrent first references to the same name create it once.
#[derive(Debug, Default)]
pub struct PartitionRegistry {
    handles: Mutex<HashMap<String, PartitionHandle>>,
}

impl PartitionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `name`, or run `create` and cache its result.
    ///
    /// # Errors
    ///
    /// Propagates the error from `create`; nothing is cached in that case.
    pub async fn get_or_create<F, Fut>(&self, name: &str, create: F) -> Result<PartitionHandle, DbError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PartitionHandle, DbError>>,
    {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }

        let handle = create().await?;
        tracing::debug!(partition = %handle.name, topic = %handle.topic, "partition registered");
        handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, name: &str) -> Option<PartitionHandle> {
        self.handles.lock().await.get(name).cloned()
    }

    /// Cache a handle discovered outside [`Self::get_or_create`]; an existing
    /// entry wins.
    pub async fn remember(&self, handle: PartitionHandle) -> PartitionHandle {
        let mut handles = self.handles.lock().await;
        handles
            .entry(handle.name.clone())
            .or_insert(handle)
            .clone()
    }

    /// Every cached handle, sorted by name.
    pub async fn all(&self) -> Vec<PartitionHandle> {
        let mut handles: Vec<PartitionHandle> =
            self.handles.lock().await.values().cloned().collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }
}
