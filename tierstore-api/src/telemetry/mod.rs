//! tierstore Telemetry - structured logging setup

pub mod tracer;

pub use tracer::{init_tracer, TelemetryConfig, DEFAULT_FILTER};
