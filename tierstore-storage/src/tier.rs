//! Record tier traits.
//!
//! Both the durable file store and the in-memory cache implement
//! [`RecordTier`]; the coordinator is generic over two of them and never
//! needs to know which backend it is talking to.

use async_trait::async_trait;
use std::sync::Arc;
use tierstore_core::{Payload, Record, StorageResult, Ttl};

/// A keyed record store.
///
/// # Contract
///
/// - `get` returns `StorageError::NotFound` when nothing is stored under `uid`
/// - `put` stores `payload` under `uid`; backends without expiry ignore `ttl`
/// - Implementations must be safe for concurrent calls on different ids
#[async_trait]
pub trait RecordTier: Send + Sync {
    async fn get(&self, uid: &str) -> StorageResult<Record>;

    async fn put(&self, uid: &str, payload: &Payload, ttl: Ttl) -> StorageResult<()>;

    /// Republish a record read from another tier with `Forever` retention.
    ///
    /// The default stores the payload only; backends that keep their own
    /// creation timestamps override this to preserve `record.created_at`.
    async fn restore(&self, record: Record) -> StorageResult<()> {
        self.put(&record.uid, &record.payload, Ttl::Forever).await
    }
}

/// Callback invoked once per readable record during a scan.
///
/// Returning an error aborts the scan and the error is propagated to the
/// scan's caller.
#[async_trait]
pub trait ScanVisitor: Send {
    async fn visit(&mut self, record: Record) -> StorageResult<()>;
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records handed to the visitor.
    pub visited: usize,
    /// Entries that could not be read or parsed.
    pub skipped: usize,
}

/// A tier that can enumerate everything it holds.
#[async_trait]
pub trait ScannableTier: RecordTier {
    /// Visit every readable record. Unreadable entries are skipped and
    /// counted; they never abort the scan.
    async fn scan(&self, visitor: &mut dyn ScanVisitor) -> StorageResult<ScanSummary>;
}

#[async_trait]
impl<T: RecordTier + ?Sized> RecordTier for Arc<T> {
    async fn get(&self, uid: &str) -> StorageResult<Record> {
        (**self).get(uid).await
    }

    async fn put(&self, uid: &str, payload: &Payload, ttl: Ttl) -> StorageResult<()> {
        (**self).put(uid, payload, ttl).await
    }

    async fn restore(&self, record: Record) -> StorageResult<()> {
        (**self).restore(record).await
    }
}

#[async_trait]
impl<T: ScannableTier + ?Sized> ScannableTier for Arc<T> {
    async fn scan(&self, visitor: &mut dyn ScanVisitor) -> StorageResult<ScanSummary> {
        (**self).scan(visitor).await
    }
}

/// Visitor that collects every record, mostly useful in tests and tooling.
#[derive(Debug, Default)]
pub struct CollectVisitor {
    pub records: Vec<Record>,
}

#[async_trait]
impl ScanVisitor for CollectVisitor {
    async fn visit(&mut self, record: Record) -> StorageResult<()> {
        self.records.push(record);
        Ok(())
    }
}
