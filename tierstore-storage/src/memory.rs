//! In-memory tier (fast tier).
//!
//! Two `moka::future::Cache`s: `Forever` records live in an unbounded cache
//! with no expiry, everything else in a cache with a per-entry [`Expiry`]
//! policy and the optional capacity bound. Size-based eviction therefore only
//! ever drops expiring records, so every durable record published here stays
//! readable. Eviction runs inside moka and never blocks unrelated keys.
//!
//! A `put` replaces whatever is stored under the identifier, in either cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use moka::Expiry;
use tierstore_core::{CacheConfig, Payload, Record, StorageError, StorageResult, Timestamp, Ttl};
use tracing::{debug, info};

use crate::tier::RecordTier;

#[derive(Debug, Clone)]
struct CachedRecord {
    payload: Arc<Payload>,
    created_at: Timestamp,
    ttl: Ttl,
    inserted_at: Instant,
}

impl CachedRecord {
    /// Lifetime left, `Forever` for non-expiring entries, `None` once elapsed.
    fn remaining(&self) -> Option<Ttl> {
        match self.ttl.duration() {
            None => Some(Ttl::Forever),
            Some(total) => {
                let left = total.saturating_sub(self.inserted_at.elapsed());
                (!left.is_zero()).then_some(Ttl::Ephemeral(left))
            }
        }
    }
}

struct RecordExpiry;

impl Expiry<String, CachedRecord> for RecordExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl.duration()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl.duration()
    }
}

/// Fast tier with per-entry expiry.
#[derive(Clone)]
pub struct MemoryTier {
    forever: Cache<String, CachedRecord>,
    expiring: Cache<String, CachedRecord>,
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("forever", &self.forever.entry_count())
            .field("expiring", &self.expiring.entry_count())
            .finish()
    }
}

impl MemoryTier {
    /// Create a tier. `max_capacity` bounds the number of expiring entries;
    /// `Forever` entries are never evicted.
    pub fn new(max_capacity: Option<u64>) -> Self {
        info!(max_capacity = ?max_capacity, "Initializing MemoryTier");

        let mut builder = Cache::<String, CachedRecord>::builder().expire_after(RecordExpiry);
        if let Some(capacity) = max_capacity {
            builder = builder.max_capacity(capacity);
        }
        Self {
            forever: Cache::<String, CachedRecord>::builder().build(),
            expiring: builder.build(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_capacity)
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.forever.entry_count() + self.expiring.entry_count()
    }

    /// Run pending maintenance so counts and evictions are up to date.
    pub async fn sync(&self) {
        self.forever.run_pending_tasks().await;
        self.expiring.run_pending_tasks().await;
    }

    async fn insert(&self, uid: &str, entry: CachedRecord) {
        let key = uid.to_string();
        if entry.ttl.is_forever() {
            self.expiring.invalidate(uid).await;
            self.forever.insert(key, entry).await;
        } else {
            self.forever.invalidate(uid).await;
            self.expiring.insert(key, entry).await;
        }
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl RecordTier for MemoryTier {
    async fn get(&self, uid: &str) -> StorageResult<Record> {
        let entry = match self.forever.get(uid).await {
            Some(entry) => entry,
            None => self
                .expiring
                .get(uid)
                .await
                .ok_or_else(|| StorageError::not_found(uid))?,
        };
        let ttl = entry.remaining().ok_or_else(|| StorageError::not_found(uid))?;
        Ok(Record::new(
            uid,
            entry.payload.as_ref().clone(),
            entry.created_at,
            ttl,
        ))
    }

    async fn put(&self, uid: &str, payload: &Payload, ttl: Ttl) -> StorageResult<()> {
        self.insert(
            uid,
            CachedRecord {
                payload: Arc::new(payload.clone()),
                created_at: Utc::now(),
                ttl,
                inserted_at: Instant::now(),
            },
        )
        .await;
        debug!(uid = %uid, ttl_secs = ttl.as_secs_ceil(), "Cached record");
        Ok(())
    }

    async fn restore(&self, record: Record) -> StorageResult<()> {
        let uid = record.uid;
        self.insert(
            &uid,
            CachedRecord {
                payload: Arc::new(record.payload),
                created_at: record.created_at,
                ttl: Ttl::Forever,
                inserted_at: Instant::now(),
            },
        )
        .await;
        Ok(())
    }
}
