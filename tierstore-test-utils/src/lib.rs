//! tierstore Test Utilities
//!
//! Shared test infrastructure for the tierstore workspace:
//! - Proptest generators for payloads, TTLs and hostile identifiers
//! - Test fixtures for temporary data directories
//! - A scriptable in-memory `RecordTier` double

pub use tierstore_core::{
    IdentifierError, Payload, PatternUidGenerator, Record, StorageError, StorageResult, Ttl,
    UidGenerator, UidValidator,
};
pub use tierstore_storage::{FsRecordStore, MemoryTier, RecordTier, ScannableTier};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for tierstore values.

    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    /// Generate a JSON scalar.
    pub fn arb_json_leaf() -> impl Strategy<Value = Payload> {
        prop_oneof![
            Just(Payload::Null),
            any::<bool>().prop_map(Payload::from),
            any::<i64>().prop_map(Payload::from),
            "[a-zA-Z0-9 _-]{0,16}".prop_map(Payload::from),
        ]
    }

    /// Generate an arbitrary JSON value tree of bounded depth.
    pub fn arb_payload() -> impl Strategy<Value = Payload> {
        arb_json_leaf().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Payload::Array),
                prop::collection::hash_map("[a-zA-Z]{1,8}", inner, 0..4)
                    .prop_map(|map| Payload::Object(map.into_iter().collect())),
            ]
        })
    }

    /// Generate a TTL variant.
    pub fn arb_ttl() -> impl Strategy<Value = Ttl> {
        prop_oneof![
            Just(Ttl::Forever),
            (1u64..86_400).prop_map(|secs| Ttl::Ephemeral(Duration::from_secs(secs))),
        ]
    }

    /// Generate a valid identifier for the default [`PatternUidGenerator`].
    pub fn arb_uid() -> impl Strategy<Value = String> {
        "[0-9a-zA-Z]{32}"
    }

    /// Generate identifiers crafted to escape a store root.
    ///
    /// Many of them embed a valid identifier so a loose validator would
    /// accept the embedded part.
    pub fn arb_hostile_uid() -> impl Strategy<Value = String> {
        let prefix = prop_oneof![
            Just("../"),
            Just("..\\"),
            Just("/"),
            Just("./"),
            Just("/etc/"),
            Just("../../"),
            Just("C:\\"),
            Just("\0"),
            Just(""),
        ];
        let suffix = prop_oneof![
            Just(""),
            Just("/.."),
            Just("/"),
            Just("\0"),
            Just("/etc/passwd"),
        ];
        prop_oneof![
            (prefix, arb_uid(), suffix)
                .prop_map(|(p, uid, s)| format!("{}{}{}", p, uid, s)),
            "[./\\\\a-zA-Z0-9\\x00]{0,48}",
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures.

    use super::*;
    use tempfile::TempDir;

    /// A temporary data directory with a file store rooted in it.
    ///
    /// The directory is removed when the fixture is dropped.
    pub struct TestDataDir {
        pub dir: TempDir,
        pub generator: Arc<PatternUidGenerator>,
        pub store: FsRecordStore,
    }

    impl TestDataDir {
        pub fn new() -> Self {
            let dir = TempDir::new().expect("TempDir creation should succeed");
            let generator = Arc::new(PatternUidGenerator::default());
            let store = FsRecordStore::new(dir.path(), generator.clone())
                .expect("store creation should succeed");
            Self {
                dir,
                generator,
                store,
            }
        }

        pub fn uid(&self) -> String {
            self.generator.generate()
        }

        /// Write raw bytes as a store entry named `name`.
        pub fn write_raw(&self, name: &str, bytes: &[u8]) {
            std::fs::write(self.dir.path().join(name), bytes).expect("raw write should succeed");
        }

        /// Read the JSON stored under `uid` straight from disk.
        pub fn read_json(&self, uid: &str) -> Option<Payload> {
            let bytes = std::fs::read(self.dir.path().join(uid)).ok()?;
            serde_json::from_slice(&bytes).ok()
        }
    }

    impl Default for TestDataDir {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Payload used across HTTP and storage tests.
    pub fn sample_payload() -> Payload {
        serde_json::json!({"Title": "t"})
    }
}

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// In-memory `RecordTier` that can be switched into failure mode.
///
/// Accepts overwrites and never expires entries.
#[derive(Debug, Default)]
pub struct ScriptedTier {
    entries: Mutex<HashMap<String, (Payload, Ttl)>>,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    puts: AtomicUsize,
}

impl ScriptedTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tier whose writes always fail.
    pub fn failing() -> Self {
        let tier = Self::default();
        tier.set_fail_puts(true);
        tier
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.entries.lock().expect("lock").contains_key(uid)
    }

    pub fn ttl_of(&self, uid: &str) -> Option<Ttl> {
        self.entries
            .lock()
            .expect("lock")
            .get(uid)
            .map(|(_, ttl)| *ttl)
    }

    fn injected(operation: &'static str, uid: &str) -> StorageError {
        StorageError::Io {
            operation,
            uid: uid.to_string(),
            reason: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl RecordTier for ScriptedTier {
    async fn get(&self, uid: &str) -> StorageResult<Record> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(Self::injected("read", uid));
        }
        self.entries
            .lock()
            .expect("lock")
            .get(uid)
            .map(|(payload, ttl)| Record::new(uid, payload.clone(), Utc::now(), *ttl))
            .ok_or_else(|| StorageError::not_found(uid))
    }

    async fn put(&self, uid: &str, payload: &Payload, ttl: Ttl) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Self::injected("write", uid));
        }
        self.entries
            .lock()
            .expect("lock")
            .insert(uid.to_string(), (payload.clone(), ttl));
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_scripted_tier_roundtrip() {
        let tier = ScriptedTier::new();
        tier.put("a", &fixtures::sample_payload(), Ttl::Forever)
            .await
            .expect("put");
        assert!(tier.contains("a"));
        assert_eq!(tier.put_count(), 1);
        assert_eq!(
            tier.get("a").await.expect("get").payload,
            fixtures::sample_payload()
        );
    }

    #[tokio::test]
    async fn test_scripted_tier_failure_modes() {
        let tier = ScriptedTier::failing();
        assert!(tier.put("a", &Payload::Null, Ttl::Forever).await.is_err());
        assert_eq!(tier.put_count(), 0);

        tier.set_fail_puts(false);
        tier.put("a", &Payload::Null, Ttl::Forever).await.expect("put");
        tier.set_fail_gets(true);
        assert!(tier.get("a").await.is_err());
    }

    #[test]
    fn test_data_dir_fixture() {
        let data = fixtures::TestDataDir::new();
        let uid = data.uid();
        data.write_raw(&uid, b"{\"a\":1}");
        assert_eq!(data.read_json(&uid), Some(serde_json::json!({"a": 1})));
        assert_eq!(data.store.root(), data.dir.path());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_uids_validate(uid in generators::arb_uid()) {
            let generator = PatternUidGenerator::default();
            prop_assert_eq!(generator.validate(&uid), Ok(uid.clone()));
        }

        #[test]
        fn prop_generated_payloads_serialize(payload in generators::arb_payload()) {
            let bytes = serde_json::to_vec(&payload).expect("payload serializes");
            let parsed: Payload = serde_json::from_slice(&bytes).expect("payload parses");
            prop_assert_eq!(parsed, payload);
        }
    }
}
