use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use tracing::info;

use crate::error::StoreError;
use crate::model::employee::EmployeeProfile;
use crate::store::EmployeeDirectory;
use crate::store::mysql::{EMPLOYEE_SELECT, EmployeeRow};

/// Employee lookups through an in-memory cache. Misses fall through to the
/// wrapped directory; unknown ids are not cached.
pub struct CachedDirectory {
    inner: Arc<dyn EmployeeDirectory>,
    cache: Cache<u64, EmployeeProfile>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn EmployeeDirectory>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn prime(&self, profiles: &[EmployeeProfile]) {
        let futures: Vec<_> = profiles
            .iter()
            .map(|p| self.cache.insert(p.id, p.clone()))
            .collect();

        futures::future::join_all(futures).await;
    }
}

#[async_trait]
impl EmployeeDirectory for CachedDirectory {
    async fn get_employee(&self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        if let Some(profile) = self.cache.get(&employee_id).await {
            return Ok(Some(profile));
        }
        let profile = self.inner.get_employee(employee_id).await?;
        if let Some(profile) = &profile {
            self.cache.insert(employee_id, profile.clone()).await;
        }
        Ok(profile)
    }
}

/// Loads active employees into the cache in batches.
pub async fn warmup_employee_cache(
    pool: &MySqlPool,
    directory: &CachedDirectory,
    batch_size: usize,
) -> Result<usize> {
    let sql = format!("{EMPLOYEE_SELECT} WHERE e.status = 'active'");
    let mut stream = sqlx::query_as::<_, EmployeeRow>(&sql).fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(EmployeeProfile::from(row?));
        total_count += 1;

        if batch.len() >= batch_size {
            directory.prime(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        directory.prime(&batch).await;
    }

    info!(employees = total_count, "Employee cache warmup complete");
    Ok(total_count)
}
