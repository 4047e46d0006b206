//! tierstore Storage - Record Tiers and Tiering Policy
//!
//! Defines the [`RecordTier`] abstraction and its two backends:
//! - [`FsRecordStore`]: durable, one JSON file per identifier
//! - [`MemoryTier`]: in-memory with per-entry expiry
//!
//! [`TieredStore`] decides which tier(s) a write lands in and serves reads from
//! the fast tier. [`reconcile`] repopulates the fast tier from disk at startup.

pub mod coordinator;
pub mod fs_store;
pub mod memory;
pub mod reconcile;
pub mod tier;

pub use coordinator::{TierConfig, TieredStore, DEFAULT_TTL_SECS};
pub use fs_store::{FsRecordStore, DEFAULT_SCAN_CONCURRENCY};
pub use memory::MemoryTier;
pub use reconcile::{reconcile, ReconcileReport};
pub use tier::{CollectVisitor, RecordTier, ScanSummary, ScanVisitor, ScannableTier};

/// The production store: moka fast tier over a file-backed durable tier.
pub type DefaultTieredStore = TieredStore<MemoryTier, FsRecordStore>;
