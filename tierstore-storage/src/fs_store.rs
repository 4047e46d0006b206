//! File-backed persistent record store.
//!
//! One JSON file per identifier directly under the store root. The file name
//! is the canonical identifier and the file modification time is the record's
//! creation time. Records read back from disk are always `Forever`.
//!
//! # Path safety
//!
//! Identifiers come from HTTP clients, so every lookup goes through
//! [`FsRecordStore::resolve_path`], which only ever yields a direct child of
//! the absolute root:
//! - the identifier validator must accept the input and return it unchanged
//! - the canonical form must be a single normal path component
//! - the joined path's parent must be the root itself

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tierstore_core::{
    IdentifierError, Payload, Record, StorageError, StorageResult, Ttl, UidValidator,
};
use tracing::{debug, warn};

use crate::tier::{RecordTier, ScanSummary, ScanVisitor, ScannableTier};

/// Default number of files read concurrently during a scan.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 16;

/// Durable tier: a directory of JSON files.
#[derive(Clone)]
pub struct FsRecordStore {
    root: PathBuf,
    validator: Arc<dyn UidValidator>,
    scan_concurrency: usize,
}

impl std::fmt::Debug for FsRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsRecordStore")
            .field("root", &self.root)
            .field("scan_concurrency", &self.scan_concurrency)
            .finish_non_exhaustive()
    }
}

impl FsRecordStore {
    /// Create a store rooted at `root`. The directory is not touched; see
    /// [`FsRecordStore::open`] to create it.
    pub fn new(root: impl AsRef<Path>, validator: Arc<dyn UidValidator>) -> StorageResult<Self> {
        let root = absolutize(root.as_ref()).map_err(|e| StorageError::RootUnreadable {
            reason: e.kind().to_string(),
        })?;
        Ok(Self {
            root,
            validator,
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
        })
    }

    /// Create the store and make sure its root directory exists.
    pub async fn open(
        root: impl AsRef<Path>,
        validator: Arc<dyn UidValidator>,
    ) -> StorageResult<Self> {
        let store = Self::new(root, validator)?;
        tokio::fs::create_dir_all(&store.root)
            .await
            .map_err(|e| StorageError::RootUnreadable {
                reason: e.kind().to_string(),
            })?;
        Ok(store)
    }

    /// Bound on concurrent file reads during [`ScannableTier::scan`].
    pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = concurrency.max(1);
        self
    }

    /// Absolute root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an identifier to its file path, or reject it.
    pub fn resolve_path(&self, uid: &str) -> Result<PathBuf, IdentifierError> {
        let canonical = self.validator.validate(uid)?;
        if canonical != uid {
            return Err(IdentifierError::NotCanonical {
                candidate: uid.to_string(),
                canonical,
            });
        }
        check_single_component(&canonical)?;

        let path = self.root.join(&canonical);
        if path.parent() != Some(self.root.as_path()) {
            return Err(IdentifierError::EscapesRoot {
                candidate: uid.to_string(),
            });
        }
        Ok(path)
    }
}

fn unsafe_component(candidate: &str, reason: &str) -> IdentifierError {
    IdentifierError::UnsafeComponent {
        candidate: candidate.to_string(),
        reason: reason.to_string(),
    }
}

fn check_single_component(candidate: &str) -> Result<(), IdentifierError> {
    if candidate.is_empty() {
        return Err(unsafe_component(candidate, "empty"));
    }
    if candidate.contains('\0') {
        return Err(unsafe_component(candidate, "contains NUL"));
    }
    if candidate.contains('/') || candidate.contains('\\') {
        return Err(unsafe_component(candidate, "contains a path separator"));
    }
    if candidate == "." || candidate == ".." {
        return Err(unsafe_component(candidate, "relative directory reference"));
    }

    let mut components = Path::new(candidate).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == candidate => Ok(()),
        _ => Err(unsafe_component(candidate, "not a single normal path component")),
    }
}

/// Absolute, lexically cleaned form of `path`.
fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    Ok(cleaned)
}

#[async_trait]
impl RecordTier for FsRecordStore {
    async fn get(&self, uid: &str) -> StorageResult<Record> {
        let path = self.resolve_path(uid)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(StorageError::not_found(uid)),
        };
        let created_at: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| StorageError::io("stat", uid, &e))?
            .into();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io("read", uid, &e))?;
        let payload: Payload =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode {
                uid: uid.to_string(),
                reason: e.to_string(),
            })?;

        debug!(uid = %uid, "Loaded persistent record");
        Ok(Record::new(uid, payload, created_at, Ttl::Forever))
    }

    async fn put(&self, uid: &str, payload: &Payload, _ttl: Ttl) -> StorageResult<()> {
        let path = self.resolve_path(uid)?;
        let bytes = serde_json::to_vec(payload).map_err(|e| StorageError::Encode {
            uid: uid.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io("write", uid, &e))?;
        debug!(uid = %uid, "Stored persistent record");
        Ok(())
    }
}

#[async_trait]
impl ScannableTier for FsRecordStore {
    async fn scan(&self, visitor: &mut dyn ScanVisitor) -> StorageResult<ScanSummary> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::RootUnreadable {
                reason: e.kind().to_string(),
            })?;

        let mut summary = ScanSummary::default();
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => match entry.file_name().into_string() {
                    Ok(name) => names.push(name),
                    Err(raw) => {
                        warn!(entry = ?raw, "Skipping non UTF-8 entry in data directory");
                        summary.skipped += 1;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    return Err(StorageError::RootUnreadable {
                        reason: e.kind().to_string(),
                    })
                }
            }
        }

        let store = self;
        let mut reads = stream::iter(names)
            .map(move |name| async move {
                let result = RecordTier::get(store, &name).await;
                (name, result)
            })
            .buffer_unordered(self.scan_concurrency);

        while let Some((name, result)) = reads.next().await {
            match result {
                Ok(record) => {
                    visitor.visit(record).await?;
                    summary.visited += 1;
                }
                Err(e) => {
                    warn!(entry = %name, error = %e, "Skipping unreadable persistent record");
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}
