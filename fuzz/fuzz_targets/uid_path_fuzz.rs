//! Fuzz test for identifier-to-path resolution
//!
//! Feeds arbitrary strings to `FsRecordStore::resolve_path` under a validator
//! that accepts everything, so only the path checks stand between the input
//! and the filesystem. Any accepted identifier must land directly inside the
//! data directory.
//!
//! Run with: cargo +nightly fuzz run uid_path_fuzz -- -max_total_time=60

#![no_main]

use std::path::Path;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use tierstore_core::{IdentifierError, UidValidator};
use tierstore_storage::FsRecordStore;

struct AcceptAll;

impl UidValidator for AcceptAll {
    fn validate(&self, candidate: &str) -> Result<String, IdentifierError> {
        Ok(candidate.to_string())
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(store) = FsRecordStore::new("/srv/tierstore-fuzz", Arc::new(AcceptAll)) else {
        return;
    };

    if let Ok(path) = store.resolve_path(input) {
        assert_eq!(
            path.parent(),
            Some(store.root()),
            "resolved path must sit directly under the root"
        );
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some(input),
            "file name must be the identifier itself"
        );
        assert!(!Path::new(input).is_absolute());
    }
});
