//! Tiered storage coordinator.
//!
//! Decides per write which tier(s) a record lands in:
//! - no TTL requested: the configured default TTL, fast tier only, even when
//!   that default never expires
//! - `Forever` requested: durable tier first, then the fast tier
//! - positive duration: fast tier only
//!
//! Reads are served from the fast tier only and never touch the durable tier.

use tierstore_core::{Payload, Record, StorageResult, TierError, Ttl};
use tracing::{debug, info};

use crate::tier::RecordTier;

/// Fast-tier lifetime of writes without a TTL when nothing is configured.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    /// TTL applied in the fast tier when a write carries none. Never makes a
    /// write durable.
    pub default_ttl: Ttl,
}

impl TierConfig {
    pub fn new(default_ttl: Ttl) -> Self {
        Self { default_ttl }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self::new(Ttl::from_secs(DEFAULT_TTL_SECS))
    }
}

/// Two-tier record store: `memory` is the fast expiring tier, `persistent`
/// the durable one.
#[derive(Debug, Clone)]
pub struct TieredStore<M, P> {
    memory: M,
    persistent: P,
    config: TierConfig,
}

impl<M: RecordTier, P: RecordTier> TieredStore<M, P> {
    pub fn new(memory: M, persistent: P, config: TierConfig) -> Self {
        Self {
            memory,
            persistent,
            config,
        }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn persistent(&self) -> &P {
        &self.persistent
    }

    pub fn config(&self) -> TierConfig {
        self.config
    }

    /// Store a record.
    ///
    /// Only an explicitly requested `Forever` reaches the durable tier.
    /// A durable write failure returns `TierError::DurableWrite` and the fast
    /// tier is left untouched. A fast-tier failure returns
    /// `TierError::CacheWrite` even if the durable write already succeeded.
    pub async fn put(&self, uid: &str, payload: &Payload, ttl: Option<Ttl>) -> Result<(), TierError> {
        let durable = ttl.is_some_and(|ttl| ttl.is_forever());
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        if durable {
            self.persistent
                .put(uid, payload, Ttl::Forever)
                .await
                .map_err(TierError::DurableWrite)?;
        }

        self.memory
            .put(uid, payload, ttl)
            .await
            .map_err(TierError::CacheWrite)?;

        info!(uid = %uid, durable, ttl_secs = ttl.as_secs_ceil(), "Stored record");
        Ok(())
    }

    /// Fetch a record from the fast tier.
    pub async fn get(&self, uid: &str) -> StorageResult<Record> {
        let record = self.memory.get(uid).await?;
        debug!(uid = %uid, "Served record from memory tier");
        Ok(record)
    }
}
