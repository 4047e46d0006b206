//! End-to-end tests for the `/data` and `/health` routes, driven through the
//! full router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use tierstore_api::{create_api_router, AppState, CODE_NOT_FOUND, CODE_OK, INTERNAL_ERROR_MESSAGE};
use tierstore_core::{HttpConfig, PatternUidGenerator, Ttl, UidGenerator};
use tierstore_storage::{reconcile, MemoryTier, RecordTier, TierConfig, TieredStore};
use tierstore_test_utils::fixtures::{sample_payload, TestDataDir};
use tierstore_test_utils::generators::arb_payload;
use tierstore_test_utils::ScriptedTier;
use tower::ServiceExt; // for `oneshot`

const DAY_SECS: u64 = 86_400;

// ============================================================================
// HELPERS
// ============================================================================

fn build_app(
    memory: MemoryTier,
    persistent: Arc<dyn RecordTier>,
    default_ttl: Ttl,
    http: &HttpConfig,
) -> Router {
    let store = TieredStore::new(memory, persistent, TierConfig::new(default_ttl));
    let uids: Arc<dyn UidGenerator> = Arc::new(PatternUidGenerator::default());
    create_api_router(AppState::new(store, uids), http)
}

/// App over a real data directory with the default day-long TTL.
fn disk_app(data: &TestDataDir) -> Router {
    build_app(
        MemoryTier::default(),
        Arc::new(data.store.clone()),
        Ttl::from_secs(DAY_SECS),
        &HttpConfig::default(),
    )
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value), String> {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| format!("Request failed: {:?}", e))?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Ok((status, body))
}

async fn post(app: &Router, query: &str, body: impl Into<Body>) -> Result<(StatusCode, Value), String> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/data{}", query))
        .header("content-type", "application/json")
        .body(body.into())
        .map_err(|e| e.to_string())?;
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> Result<(StatusCode, Value), String> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .map_err(|e| e.to_string())?;
    send(app, request).await
}

async fn create(app: &Router, query: &str, payload: &Value) -> Result<String, String> {
    let (status, body) = post(app, query, payload.to_string()).await?;
    assert_eq!(status, StatusCode::OK, "unexpected create response: {}", body);
    assert_eq!(body["code"], CODE_OK);
    body["uid"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("no uid in {}", body))
}

// ============================================================================
// CREATE / READ
// ============================================================================

#[tokio::test]
async fn test_create_then_read_with_default_ttl() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    let uid = create(&app, "", &sample_payload()).await?;
    assert_eq!(uid.len(), 32);
    assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));

    let (status, body) = get(&app, &format!("/data?uid={}", uid)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], CODE_OK);
    assert_eq!(body["message"], "OK");
    assert_eq!(body["data"], sample_payload());
    assert!(body["createdAt"].is_string());

    let ttl = body["ttl"].as_u64().ok_or("ttl missing")?;
    assert!((DAY_SECS - 5..=DAY_SECS).contains(&ttl), "ttl was {}", ttl);

    // Default TTL is ephemeral, nothing reaches the data directory.
    assert!(data.read_json(&uid).is_none());
    Ok(())
}

#[tokio::test]
async fn test_ttl_zero_is_durable() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);
    let payload = json!({"Title": "kept", "tags": [1, 2, 3]});

    let uid = create(&app, "?ttl=0", &payload).await?;
    assert_eq!(data.read_json(&uid), Some(payload.clone()));

    let (_, body) = get(&app, &format!("/data?uid={}", uid)).await?;
    assert_eq!(body["data"], payload);
    assert_eq!(body["ttl"], 0);
    Ok(())
}

#[tokio::test]
async fn test_explicit_ttl_stays_in_memory() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    let uid = create(&app, "?ttl=30", &json!([1, "two", null])).await?;
    assert!(data.read_json(&uid).is_none());

    let (_, body) = get(&app, &format!("/data?uid={}", uid)).await?;
    let ttl = body["ttl"].as_u64().ok_or("ttl missing")?;
    assert!((25..=30).contains(&ttl), "ttl was {}", ttl);
    Ok(())
}

#[tokio::test]
async fn test_expired_record_reads_as_not_found() -> Result<(), String> {
    let app = build_app(
        MemoryTier::default(),
        Arc::new(ScriptedTier::new()),
        Ttl::Ephemeral(Duration::from_millis(50)),
        &HttpConfig::default(),
    );

    let uid = create(&app, "", &sample_payload()).await?;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let (status, body) = get(&app, &format!("/data?uid={}", uid)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], CODE_NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_absent_ttl_never_reaches_disk() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = build_app(
        MemoryTier::default(),
        Arc::new(data.store.clone()),
        Ttl::from_secs(0),
        &HttpConfig::default(),
    );

    for query in ["", "?ttl="] {
        let uid = create(&app, query, &sample_payload()).await?;
        assert!(data.read_json(&uid).is_none(), "{:?} wrote to disk", query);

        let (_, body) = get(&app, &format!("/data?uid={}", uid)).await?;
        assert_eq!(body["data"], sample_payload());
        assert_eq!(body["ttl"], 0);
    }

    let entries = std::fs::read_dir(data.dir.path()).map_err(|e| e.to_string())?;
    assert_eq!(entries.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_uid_is_not_found() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);
    let expected = json!({"code": CODE_NOT_FOUND, "message": "Not found"});

    for uri in [
        format!("/data?uid={}", data.uid()),
        "/data?uid=".to_string(),
        "/data".to_string(),
        "/data?uid=..%2F..%2Fetc%2Fpasswd".to_string(),
    ] {
        let (status, body) = get(&app, &uri).await?;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, expected, "{}", uri);
    }
    Ok(())
}

// ============================================================================
// REJECTIONS
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_rejected() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    let (status, body) = post(&app, "", "{\"Title\": ").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = post(&app, "?ttl=0", "").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let entries = std::fs::read_dir(data.dir.path()).map_err(|e| e.to_string())?;
    assert_eq!(entries.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_oversized_body_is_rejected() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    let big = json!({"blob": "x".repeat(2048)});
    let (status, body) = post(&app, "?ttl=0", big.to_string()).await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    let entries = std::fs::read_dir(data.dir.path()).map_err(|e| e.to_string())?;
    assert_eq!(entries.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_bad_ttl_is_rejected() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    for query in ["?ttl=-1", "?ttl=abc", "?ttl=1.5"] {
        let (status, body) = post(&app, query, sample_payload().to_string()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(body["code"], "INVALID_FORMAT", "{}", query);
    }
    Ok(())
}

#[tokio::test]
async fn test_unsupported_method() -> Result<(), String> {
    let data = TestDataDir::new();
    let app = disk_app(&data);

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/data")
        .body(Body::from(sample_payload().to_string()))
        .map_err(|e| e.to_string())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn test_durable_write_failure_is_internal_error() -> Result<(), String> {
    let memory = MemoryTier::default();
    let app = build_app(
        memory.clone(),
        Arc::new(ScriptedTier::failing()),
        Ttl::from_secs(DAY_SECS),
        &HttpConfig::default(),
    );

    let (status, body) = post(&app, "?ttl=0", sample_payload().to_string()).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);

    memory.sync().await;
    assert_eq!(memory.entry_count(), 0);

    // Ephemeral writes never touch the failing tier.
    create(&app, "?ttl=60", &sample_payload()).await?;
    Ok(())
}

// ============================================================================
// RESTART
// ============================================================================

#[tokio::test]
async fn test_durable_records_survive_restart() -> Result<(), String> {
    let data = TestDataDir::new();
    let payload = json!({"Title": "persisted", "n": 7});

    let uid = {
        let app = disk_app(&data);
        let kept = create(&app, "?ttl=0", &payload).await?;
        create(&app, "?ttl=60", &sample_payload()).await?;
        kept
    };

    let memory = MemoryTier::default();
    let report = reconcile(&data.store, &memory)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped, 0);

    let app = build_app(
        memory,
        Arc::new(data.store.clone()),
        Ttl::from_secs(DAY_SECS),
        &HttpConfig::default(),
    );
    let (_, body) = get(&app, &format!("/data?uid={}", uid)).await?;
    assert_eq!(body["code"], CODE_OK);
    assert_eq!(body["data"], payload);
    assert_eq!(body["ttl"], 0);
    Ok(())
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() -> Result<(), String> {
    let data = TestDataDir::new();
    let store = TieredStore::new(
        MemoryTier::default(),
        Arc::new(data.store.clone()) as Arc<dyn RecordTier>,
        TierConfig::new(Ttl::Forever),
    );
    let uids: Arc<dyn UidGenerator> = Arc::new(PatternUidGenerator::default());
    let state = AppState::new(store, uids).with_data_root(data.dir.path());
    let app = create_api_router(state, &HttpConfig::default());

    let (status, body) = get(&app, "/health/ping").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("pong".to_string()));

    let (status, body) = get(&app, "/health/live").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    create(&app, "", &sample_payload()).await?;
    let (status, body) = get(&app, "/health/ready").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["storage"]["status"], "healthy");
    assert!(body["details"]["cache_entries"].is_u64());
    Ok(())
}

#[tokio::test]
async fn test_readiness_fails_without_data_dir() -> Result<(), String> {
    let data = TestDataDir::new();
    let store = TieredStore::new(
        MemoryTier::default(),
        Arc::new(ScriptedTier::new()) as Arc<dyn RecordTier>,
        TierConfig::new(Ttl::Forever),
    );
    let uids: Arc<dyn UidGenerator> = Arc::new(PatternUidGenerator::default());
    let state = AppState::new(store, uids).with_data_root(data.dir.path().join("gone"));
    let app = create_api_router(state, &HttpConfig::default());

    let (status, body) = get(&app, "/health/ready").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"]["storage"]["status"], "unhealthy");
    Ok(())
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any JSON value stored durably reads back unchanged.
    #[test]
    fn prop_durable_payload_round_trips(payload in arb_payload()) {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let http = HttpConfig {
            max_request_body: 64 * 1024,
            ..HttpConfig::default()
        };
        let data = TestDataDir::new();
        let app = build_app(
            MemoryTier::default(),
            Arc::new(data.store.clone()),
            Ttl::from_secs(DAY_SECS),
            &http,
        );

        let (read, on_disk) = runtime.block_on(async {
            let uid = create(&app, "?ttl=0", &payload).await?;
            let (_, body) = get(&app, &format!("/data?uid={}", uid)).await?;
            Ok::<_, String>((body["data"].clone(), data.read_json(&uid)))
        }).expect("round trip");

        prop_assert_eq!(&read, &payload);
        prop_assert_eq!(on_disk, Some(payload));
    }
}
