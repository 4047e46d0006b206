//! Startup reconciliation: republish every durable record into the fast tier.
//!
//! Must complete before reads are served. Unreadable files are skipped by the
//! scan; a fast-tier write failure aborts startup.

use async_trait::async_trait;
use tierstore_core::{Record, StorageError, StorageResult, TierError};
use tracing::info;

use crate::tier::{RecordTier, ScanVisitor, ScannableTier};

/// Counts from a completed reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records republished into the fast tier.
    pub loaded: usize,
    /// Durable entries that could not be read or parsed.
    pub skipped: usize,
}

struct Republisher<'a, M: ?Sized> {
    memory: &'a M,
    failed: Option<String>,
}

#[async_trait]
impl<M: RecordTier + ?Sized> ScanVisitor for Republisher<'_, M> {
    async fn visit(&mut self, record: Record) -> StorageResult<()> {
        let uid = record.uid.clone();
        if let Err(e) = self.memory.restore(record).await {
            self.failed = Some(uid);
            return Err(e);
        }
        Ok(())
    }
}

/// Load every readable record of `persistent` into `memory` with `Forever`
/// retention.
pub async fn reconcile<P, M>(persistent: &P, memory: &M) -> Result<ReconcileReport, TierError>
where
    P: ScannableTier + ?Sized,
    M: RecordTier + ?Sized,
{
    let mut republisher = Republisher {
        memory,
        failed: None,
    };

    let summary = match persistent.scan(&mut republisher).await {
        Ok(summary) => summary,
        Err(source) => return Err(classify(republisher.failed, source)),
    };

    let report = ReconcileReport {
        loaded: summary.visited,
        skipped: summary.skipped,
    };
    info!(
        loaded = report.loaded,
        skipped = report.skipped,
        "Loaded persistent records into memory storage"
    );
    Ok(report)
}

fn classify(failed_uid: Option<String>, source: StorageError) -> TierError {
    match failed_uid {
        Some(uid) => TierError::Reconciliation { uid, source },
        None => TierError::ScanFailed(source),
    }
}
