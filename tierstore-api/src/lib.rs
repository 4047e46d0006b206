//! tierstore API - HTTP Layer
//!
//! Exposes the tiered record store over Axum: `POST /data` stores a JSON
//! value under a freshly minted identifier, `GET /data?uid=` reads it back
//! from the in-memory tier. Durable records are re-published into memory by
//! reconciliation before the listener starts.

#[macro_use]
pub mod macros;

pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorCode, INTERNAL_ERROR_MESSAGE};
pub use routes::create_api_router;
pub use routes::data::{DataResponse, CODE_NOT_FOUND, CODE_OK};
pub use state::{ApiStore, AppState};
