//! tierstore Core - Record Types
//!
//! Shared data structures for the tiered record store: records, TTL
//! classification, identifier capabilities, errors and service configuration.
//! All other crates depend on this.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod config;
pub mod error;
pub mod identity;

pub use config::{CacheConfig, DataConfig, HttpConfig, LogConfig, ServiceConfig, UidConfig};
pub use error::{
    ConfigError, IdentifierError, StorageError, StorageResult, TierError, TierStoreError,
    TierStoreResult,
};
pub use identity::{PatternUidGenerator, UidGenerator, UidValidator};

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Arbitrary JSON value tree. Opaque to storage.
pub type Payload = serde_json::Value;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// TTL
// ============================================================================

/// Retention classification of a record.
///
/// `Forever` records never expire and are eligible for the durable tier.
/// A zero `Ephemeral` duration is treated as `Forever`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ttl {
    Forever,
    Ephemeral(Duration),
}

impl Ttl {
    /// `0` maps to `Forever`, anything else to an ephemeral duration.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Ttl::Forever
        } else {
            Ttl::Ephemeral(Duration::from_secs(secs))
        }
    }

    pub fn is_forever(&self) -> bool {
        match self {
            Ttl::Forever => true,
            Ttl::Ephemeral(d) => d.is_zero(),
        }
    }

    /// Expiry duration, or `None` for non-expiring records.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::Forever => None,
            Ttl::Ephemeral(d) if d.is_zero() => None,
            Ttl::Ephemeral(d) => Some(*d),
        }
    }

    /// Whole seconds, rounded up so a still-live entry never reports `0`.
    /// `Forever` reports `0`.
    pub fn as_secs_ceil(&self) -> u64 {
        match self.duration() {
            None => 0,
            Some(d) if d.subsec_nanos() > 0 => d.as_secs() + 1,
            Some(d) => d.as_secs(),
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A stored record as returned by any tier.
///
/// For cache reads `ttl` is the remaining lifetime, not the original one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub uid: String,
    pub payload: Payload,
    pub created_at: Timestamp,
    pub ttl: Ttl,
}

impl Record {
    pub fn new(uid: impl Into<String>, payload: Payload, created_at: Timestamp, ttl: Ttl) -> Self {
        Self {
            uid: uid.into(),
            payload,
            created_at,
            ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_ttl_from_secs() {
        assert_eq!(Ttl::from_secs(0), Ttl::Forever);
        assert_eq!(Ttl::from_secs(5), Ttl::Ephemeral(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_ephemeral_is_forever() {
        let ttl = Ttl::Ephemeral(Duration::ZERO);
        assert!(ttl.is_forever());
        assert_eq!(ttl.duration(), None);
        assert_eq!(ttl.as_secs_ceil(), 0);
    }

    #[test]
    fn test_as_secs_ceil_rounds_up() {
        assert_eq!(Ttl::Ephemeral(Duration::from_millis(1)).as_secs_ceil(), 1);
        assert_eq!(Ttl::Ephemeral(Duration::from_millis(59_001)).as_secs_ceil(), 60);
        assert_eq!(Ttl::Ephemeral(Duration::from_secs(60)).as_secs_ceil(), 60);
        assert_eq!(Ttl::Forever.as_secs_ceil(), 0);
    }

    #[test]
    fn test_record_new() {
        let now = Utc::now();
        let record = Record::new("abc", json!({"Title": "t"}), now, Ttl::Forever);
        assert_eq!(record.uid, "abc");
        assert_eq!(record.payload["Title"], "t");
        assert_eq!(record.created_at, now);
    }

    proptest! {
        #[test]
        fn prop_as_secs_ceil_covers_duration(millis in 1u64..10_000_000) {
            let ttl = Ttl::Ephemeral(Duration::from_millis(millis));
            let secs = ttl.as_secs_ceil();
            prop_assert!(secs >= 1);
            prop_assert!(Duration::from_secs(secs) >= Duration::from_millis(millis));
            prop_assert!(Duration::from_secs(secs) < Duration::from_millis(millis) + Duration::from_secs(1));
        }
    }
}
