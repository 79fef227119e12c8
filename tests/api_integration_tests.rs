//! Integration Tests for the Admin API
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tiercache::remote::{MemoryStore, RemoteStore};
use tiercache::{api::create_router, AppState, CacheClient, ClientSettings, Config, DomainCacheManager};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, Arc<DomainCacheManager>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let remote: Arc<dyn RemoteStore> = store.clone();
    let config = Config {
        flush_debounce_ms: 3_600_000,
        ..Config::default()
    };
    let client = CacheClient::new(ClientSettings::from_config(&config), Some(remote));
    let manager = Arc::new(DomainCacheManager::new(Arc::new(client), &config));
    let app = create_router(AppState::new(manager.clone()));
    (app, manager, store)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Health ==

#[tokio::test]
async fn test_health_endpoint_reports_backend() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
}

// == Stats ==

#[tokio::test]
async fn test_stats_endpoint_fields() {
    let (app, manager, _) = create_test_app();
    manager.client().set("k", "v", Some(60)).await;
    manager.client().get("k").await;

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["localHits"], 1);
    assert_eq!(json["remoteCalls"], 0);
    assert_eq!(json["batchedWrites"], 0);
    assert_eq!(json["hitRate"], 100);
    assert_eq!(json["localCacheSize"], 1);
    assert_eq!(json["pendingWrites"], 1);
}

// == Flush ==

#[tokio::test]
async fn test_flush_endpoint_sends_pending_writes() {
    let (app, manager, store) = create_test_app();
    manager.client().set("a", "1", Some(60)).await;
    manager.client().set("b", "2", Some(60)).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/flush")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["flushed"], 2);
    assert_eq!(store.calls().pipeline, 1);
}

// == Invalidate ==

#[tokio::test]
async fn test_invalidate_endpoint() {
    let (app, manager, store) = create_test_app();
    store.seed("schedule:1", "{}");
    manager.client().set("schedule:2", "{}", Some(60)).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"keys":["schedule:1","schedule:2"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["deleted"], 1);
    assert!(!manager.client().has_pending("schedule:2"));
    assert_eq!(store.stored("schedule:1"), None);
}

#[tokio::test]
async fn test_invalidate_endpoint_rejects_patterns() {
    let (app, _, store) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"keys":["session:*"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("session:*"));
    assert_eq!(store.calls().del, 0);
}

#[tokio::test]
async fn test_invalidate_endpoint_malformed_body() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"keys": "not-a-list"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Clear Local ==

#[tokio::test]
async fn test_clear_local_endpoint_keeps_remote() {
    let (app, manager, store) = create_test_app();
    manager.client().set("k", "v", Some(60)).await;
    manager.flush().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stats = manager.statistics();
    assert_eq!(stats.local_cache_size, 0);
    assert_eq!(stats.batched_writes, 0);
    assert_eq!(store.stored("k"), Some("v".to_string()));
}
