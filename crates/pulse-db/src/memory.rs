use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use pulse_core::{partition_name, Analysis, PartitionHandle, PlatformFamily, SocialPost};
use tokio::sync::Mutex;

use crate::{DbError, PartitionRegistry, TopicStore};

/// In-process [`TopicStore`]. The registry is the record of which partitions
/// exist; posts are keyed by partition name, then `source_id`.
#[derive(Debug, Default)]
pub struct MemoryTopicStore {
    registry: PartitionRegistry,
    posts: Mutex<HashMap<String, HashMap<String, SocialPost>>>,
}

impl MemoryTopicStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn require(&self, partition: &PartitionHandle) -> Result<(), DbError> {
        if self.registry.get(&partition.name).await.is_none() {
            return Err(DbError::PartitionNotFound(partition.name.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl TopicStore for MemoryTopicStore {
    async fn partition_for(
        &self,
        topic: &str,
        family: PlatformFamily,
    ) -> Result<PartitionHandle, DbError> {
        let name = partition_name(topic, family)?;
        self.registry
            .get_or_create(&name, || async {
                self.posts.lock().await.entry(name.clone()).or_default();
                Ok(PartitionHandle {
                    name: name.clone(),
                    topic: topic.trim().to_string(),
                    platform_family: family,
                    created_at: Utc::now(),
                })
            })
            .await
    }

    async fn find_partition(&self, name: &str) -> Result<Option<PartitionHandle>, DbError> {
        Ok(self.registry.get(name).await)
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionHandle>, DbError> {
        Ok(self.registry.all().await)
    }

    async fn upsert(&self, partition: &PartitionHandle, post: &SocialPost) -> Result<(), DbError> {
        self.require(partition).await?;
        let mut posts = self.posts.lock().await;
        let bucket = posts.entry(partition.name.clone()).or_default();

        let preserved = bucket
            .get(&post.source_id)
            .and_then(|existing| existing.analysis.clone());
        let mut stored = post.clone();
        stored.analysis = preserved;
        bucket.insert(post.source_id.clone(), stored);
        Ok(())
    }

    async fn list_all(&self, partition: &PartitionHandle) -> Result<Vec<SocialPost>, DbError> {
        self.require(partition).await?;
        let posts = self.posts.lock().await;
        Ok(posts
            .get(&partition.name)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_analysis(
        &self,
        partition: &PartitionHandle,
        source_id: &str,
        analysis: &Analysis,
    ) -> Result<(), DbError> {
        self.require(partition).await?;
        let mut posts = self.posts.lock().await;
        let post = posts
            .get_mut(&partition.name)
            .and_then(|bucket| bucket.get_mut(source_id))
            .ok_or_else(|| DbError::PostNotFound {
                partition: partition.name.clone(),
                source_id: source_id.to_string(),
            })?;
        post.analysis = Some(analysis.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
