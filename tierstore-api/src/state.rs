//! Shared application state for Axum routers.

use std::path::PathBuf;
use std::sync::Arc;

use tierstore_core::UidGenerator;
use tierstore_storage::{MemoryTier, RecordTier, TieredStore};

/// Store used by the HTTP layer: moka fast tier over any durable tier.
pub type ApiStore = TieredStore<MemoryTier, Arc<dyn RecordTier>>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ApiStore>,
    /// Mints identifiers for new records.
    pub uids: Arc<dyn UidGenerator>,
    /// Durable data directory, probed by the readiness check.
    pub data_root: Option<PathBuf>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(store: ApiStore, uids: Arc<dyn UidGenerator>) -> Self {
        Self {
            store: Arc::new(store),
            uids,
            data_root: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }
}

crate::impl_from_ref!(Arc<ApiStore>, store);
crate::impl_from_ref!(Arc<dyn UidGenerator>, uids);
