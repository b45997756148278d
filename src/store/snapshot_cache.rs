use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::{
    model::analytics::{AnalyticsSnapshot, SnapshotKey},
    store::{SnapshotStore, StoreResult},
};

/// Snapshots older than this are recomputed.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// In-process snapshot store for deployments that do not persist analytics.
pub struct MokaSnapshotStore {
    cache: Cache<SnapshotKey, AnalyticsSnapshot>,
}

impl MokaSnapshotStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(SNAPSHOT_TTL)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl SnapshotStore for MokaSnapshotStore {
    async fn find_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<AnalyticsSnapshot>> {
        Ok(self.cache.get(key).await)
    }

    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
        self.cache.insert(snapshot.key(), snapshot.clone()).await;
        Ok(())
    }
}
