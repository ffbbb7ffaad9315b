use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{
    partition_name, Analysis, PartitionHandle, PlatformFamily, PostMetrics, SocialPost,
};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::{DbError, PartitionRegistry, TopicStore};

/// [`TopicStore`] backed by Postgres.
///
/// Partitions are rows in `topic_partitions`; posts share one `social_posts`
/// table keyed by `(partition_name, source_id)`.
#[derive(Debug)]
pub struct PgTopicStore {
    pool: PgPool,
    registry: PartitionRegistry,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PartitionRow {
    name: String,
    topic: String,
    platform_family: String,
    created_at: DateTime<Utc>,
}

impl PartitionRow {
    fn into_handle(self) -> Result<PartitionHandle, DbError> {
        Ok(PartitionHandle {
            name: self.name,
            topic: self.topic,
            platform_family: self.platform_family.parse::<PlatformFamily>()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SocialPostRow {
    source_id: String,
    topic: String,
    body: String,
    posted_at: DateTime<Utc>,
    author: Option<String>,
    like_count: Option<i64>,
    comment_count: Option<i64>,
    share_count: Option<i64>,
    view_count: Option<i64>,
    media_url: Option<String>,
    permalink: Option<String>,
    analysis: Option<serde_json::Value>,
}

impl SocialPostRow {
    fn into_post(self) -> Result<SocialPost, DbError> {
        let analysis = self
            .analysis
            .map(serde_json::from_value::<Analysis>)
            .transpose()?;
        Ok(SocialPost {
            topic: self.topic,
            source_id: self.source_id,
            text: self.body,
            created_at: self.posted_at,
            author: self.author,
            metrics: PostMetrics {
                like_count: self.like_count.map(from_db_count),
                comment_count: self.comment_count.map(from_db_count),
                share_count: self.share_count.map(from_db_count),
                view_count: self.view_count.map(from_db_count),
            },
            media_url: self.media_url,
            permalink: self.permalink,
            analysis,
        })
    }
}

// Counts are CHECK-constrained to be non-negative.
fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl PgTopicStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            registry: PartitionRegistry::new(),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn require(&self, partition: &PartitionHandle) -> Result<(), DbError> {
        if self.find_partition(&partition.name).await?.is_none() {
            return Err(DbError::PartitionNotFound(partition.name.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl TopicStore for PgTopicStore {
    async fn partition_for(
        &self,
        topic: &str,
        family: PlatformFamily,
    ) -> Result<PartitionHandle, DbError> {
        let name = partition_name(topic, family)?;
        self.registry
            .get_or_create(&name, || async {
                // The no-op update makes RETURNING yield the existing row when
                // another process created the partition first.
                let row = sqlx::query_as::<_, PartitionRow>(
                    "INSERT INTO topic_partitions (name, topic, platform_family) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
                     RETURNING name, topic, platform_family, created_at",
                )
                .bind(&name)
                .bind(topic.trim())
                .bind(family.as_str())
                .fetch_one(&self.pool)
                .await?;
                row.into_handle()
            })
            .await
    }

    async fn find_partition(&self, name: &str) -> Result<Option<PartitionHandle>, DbError> {
        if let Some(handle) = self.registry.get(name).await {
            return Ok(Some(handle));
        }

        let row = sqlx::query_as::<_, PartitionRow>(
            "SELECT name, topic, platform_family, created_at \
             FROM topic_partitions WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.registry.remember(row.into_handle()?).await)),
            None => Ok(None),
        }
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionHandle>, DbError> {
        let rows = sqlx::query_as::<_, PartitionRow>(
            "SELECT name, topic, platform_family, created_at \
             FROM topic_partitions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut handles = Vec::with_capacity(rows.len());
        for row in rows {
            handles.push(self.registry.remember(row.into_handle()?).await);
        }
        Ok(handles)
    }

    async fn upsert(&self, partition: &PartitionHandle, post: &SocialPost) -> Result<(), DbError> {
        self.require(partition).await?;
        sqlx::query(
            "INSERT INTO social_posts \
               (partition_name, source_id, topic, body, posted_at, author, \
                like_count, comment_count, share_count, view_count, media_url, permalink) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (partition_name, source_id) DO UPDATE SET \
               topic = EXCLUDED.topic, \
               body = EXCLUDED.body, \
               posted_at = EXCLUDED.posted_at, \
               author = EXCLUDED.author, \
               like_count = EXCLUDED.like_count, \
               comment_count = EXCLUDED.comment_count, \
               share_count = EXCLUDED.share_count, \
               view_count = EXCLUDED.view_count, \
               media_url = EXCLUDED.media_url, \
               permalink = EXCLUDED.permalink, \
               updated_at = NOW()",
        )
        .bind(&partition.name)
        .bind(&post.source_id)
        .bind(&post.topic)
        .bind(&post.text)
        .bind(post.created_at)
        .bind(post.author.as_deref())
        .bind(post.metrics.like_count.map(to_db_count))
        .bind(post.metrics.comment_count.map(to_db_count))
        .bind(post.metrics.share_count.map(to_db_count))
        .bind(post.metrics.view_count.map(to_db_count))
        .bind(post.media_url.as_deref())
        .bind(post.permalink.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_all(&self, partition: &PartitionHandle) -> Result<Vec<SocialPost>, DbError> {
        self.require(partition).await?;
        let rows = sqlx::query_as::<_, SocialPostRow>(
            "SELECT source_id, topic, body, posted_at, author, \
                    like_count, comment_count, share_count, view_count, \
                    media_url, permalink, analysis \
             FROM social_posts \
             WHERE partition_name = $1 \
             ORDER BY posted_at DESC, source_id",
        )
        .bind(&partition.name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SocialPostRow::into_post).collect()
    }

    async fn set_analysis(
        &self,
        partition: &PartitionHandle,
        source_id: &str,
        analysis: &Analysis,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE social_posts SET analysis = $3, updated_at = NOW() \
             WHERE partition_name = $1 AND source_id = $2",
        )
        .bind(&partition.name)
        .bind(source_id)
        .bind(Json(analysis))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.require(partition).await?;
            return Err(DbError::PostNotFound {
                partition: partition.name.clone(),
                source_id: source_id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_saturate_across_the_signed_boundary() {
        assert_eq!(to_db_count(42), 42);
        assert_eq!(to_db_count(u64::MAX), i64::MAX);
        assert_eq!(from_db_count(7), 7);
        assert_eq!(from_db_count(-1), 0);
    }

    #[test]
    fn unknown_family_in_partition_row_is_rejected() {
        let row = PartitionRow {
            name: "tweets_x".into(),
            topic: "x".into(),
            platform_family: "myspace".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(row.into_handle(), Err(DbError::InvalidRequest(_))));
    }

    #[test]
    fn row_without_analysis_maps_to_post() {
        let row = SocialPostRow {
            source_id: "1".into(),
            topic: "rust".into(),
            body: "hello".into(),
            posted_at: Utc::now(),
            author: None,
            like_count: Some(3),
            comment_count: None,
            share_count: Some(0),
            view_count: None,
            media_url: None,
            permalink: None,
            analysis: None,
        };
        let post = row.into_post().unwrap();
        assert_eq!(post.text, "hello");
        assert_eq!(post.metrics.like_count, Some(3));
        assert_eq!(post.metrics.comment_count, None);
        assert!(post.analysis.is_none());
    }
}
