//! Data Endpoints
//!
//! - `POST /data[?ttl=N]` stores any JSON value and returns its new uid
//! - `GET /data?uid=<uid>` returns the stored value
//!
//! `ttl` absent applies the configured default, `0` stores durably, a
//! positive value keeps the record in memory for that many seconds.
//! Lookups of unknown ids answer `200` with a "Not found" body.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tierstore_core::{Payload, StorageError, Timestamp, Ttl, UidGenerator};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiStore;

/// Result code of a successful call.
pub const CODE_OK: i32 = 0;
/// Result code of a lookup for an unknown id.
pub const CODE_NOT_FOUND: i32 = 10;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateParams {
    pub ttl: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadParams {
    pub uid: Option<String>,
}

/// Response envelope shared by both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Remaining lifetime in seconds, `0` for records that never expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl DataResponse {
    fn ok() -> Self {
        Self {
            code: CODE_OK,
            message: "OK".to_string(),
            data: None,
            created_at: None,
            ttl: None,
            uid: None,
        }
    }

    pub fn created(uid: String) -> Self {
        Self {
            uid: Some(uid),
            ..Self::ok()
        }
    }

    pub fn found(payload: Payload, created_at: Timestamp, ttl: Ttl) -> Self {
        Self {
            data: Some(payload),
            created_at: Some(created_at),
            ttl: Some(ttl.as_secs_ceil()),
            ..Self::ok()
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: CODE_NOT_FOUND,
            message: "Not found".to_string(),
            ..Self::ok()
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /data - Store a JSON value
pub async fn create(
    State(store): State<Arc<ApiStore>>,
    State(uids): State<Arc<dyn UidGenerator>>,
    Query(params): Query<CreateParams>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<DataResponse>> {
    let ttl = parse_ttl(params.ttl.as_deref())?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large()
        } else {
            ApiError::invalid_input("Can't read request body")
        }
    })?;
    let payload: Payload = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "Rejected malformed JSON body");
        ApiError::invalid_input("Invalid JSON body")
    })?;

    let uid = uids.generate();
    store.put(&uid, &payload, ttl).await?;

    Ok(Json(DataResponse::created(uid)))
}

/// GET /data - Fetch a stored JSON value
pub async fn read(
    State(store): State<Arc<ApiStore>>,
    Query(params): Query<ReadParams>,
) -> ApiResult<Json<DataResponse>> {
    let Some(uid) = params.uid.filter(|uid| !uid.is_empty()) else {
        return Ok(Json(DataResponse::not_found()));
    };

    match store.get(&uid).await {
        Ok(record) => Ok(Json(DataResponse::found(
            record.payload,
            record.created_at,
            record.ttl,
        ))),
        Err(StorageError::NotFound { .. }) | Err(StorageError::InvalidIdentifier(_)) => {
            debug!(uid = %uid, "Record not found");
            Ok(Json(DataResponse::not_found()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse the `ttl` query parameter. Empty or absent means "use the default".
fn parse_ttl(raw: Option<&str>) -> ApiResult<Option<Ttl>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(|secs| Some(Ttl::from_secs(secs)))
            .map_err(|_| ApiError::invalid_format("ttl", "a non-negative number of seconds")),
    }
}
